#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

pub fn which() -> Environment {
    #[cfg(debug_assertions)]
    let default_env = Environment::Development;
    #[cfg(not(debug_assertions))]
    let default_env = Environment::Production;

    match std::env::var("ENV").as_deref() {
        Ok("production") | Ok("PRODUCTION") => Environment::Production,
        Ok("development") | Ok("DEVELOPMENT") => Environment::Development,
        _ => default_env,
    }
}
