pub mod clock;
pub mod config;
pub mod error;
pub mod state;

pub mod crypto {
    pub mod token;
}

pub mod models {
    pub mod session;
    pub mod token;
}

pub mod repositories {
    pub mod session;
}

pub mod services {
    pub mod maintenance;
    pub mod sessions;
    pub mod tokens;
}
