use crate::config::EngineConfig;
use crate::device::RamDevice;
use crate::engine::Engine;

pub(crate) fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Mounted engine over a fresh in-memory device.
pub(crate) fn make_engine(cache_lines: usize) -> Engine<RamDevice> {
    let config = EngineConfig::default().with_cache_lines(cache_lines);
    let mut engine = Engine::new(RamDevice::new(), config);
    engine.mount().unwrap();
    engine
}
