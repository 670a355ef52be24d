use std::env;

/// Reads an environment variable, treating an empty value as unset.
pub fn get_env_opt(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
