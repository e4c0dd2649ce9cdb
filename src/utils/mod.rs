pub(crate) mod input;
pub(crate) mod logging;

pub(crate) use input::read_input;
pub(crate) use logging::init_logging;
