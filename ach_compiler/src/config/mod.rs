//! Configuration module for the achievement script compiler
//! Automatically uses generated constants from TOML configuration

// Include generated constants from build.rs
include!(concat!(env!("OUT_DIR"), "/constants.rs"));

pub mod constants;
pub mod runtime;

/// Build information and configuration metadata
pub mod build_info {
    /// Returns the configuration profile used during build
    pub fn profile() -> &'static str {
        option_env!("ACH_BUILD_PROFILE").unwrap_or("development")
    }

    /// Returns the configuration directory used during build
    pub fn config_dir() -> &'static str {
        option_env!("ACH_CONFIG_DIR").unwrap_or("config")
    }

    /// Returns configuration source information
    pub fn source_info() -> String {
        format!("Generated from {}/{}.toml", config_dir(), profile())
    }

    /// Returns the OUT_DIR path used for generation (for debugging)
    pub fn out_dir() -> &'static str {
        env!("OUT_DIR")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_limits_respect_ceilings() {
        assert_eq!(compile_time::interpreter::MAX_CALL_DEPTH, 100);
        assert!(compile_time::serialization::DEFAULT_ADDRESS_WIDTH >= 1);
        assert!(compile_time::serialization::DEFAULT_ADDRESS_WIDTH <= 8);
        assert!(compile_time::normalization::MAX_BCD_DIGITS <= 8);
    }

    #[test]
    fn test_build_info_source() {
        assert!(build_info::source_info().ends_with(".toml"));
    }
}
