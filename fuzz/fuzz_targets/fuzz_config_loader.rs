#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse, clamp and validate must never panic; errors are fine.
    if let Ok(mut cfg) = stroker_config::load_toml(data) {
        cfg.normalize();
        if cfg.validate().is_ok() {
            let _ = stroker_core::EngineSettings::try_from(&cfg);
        }
    }
});
