pub mod sensor;

pub use sensor::{page_identifier, sensor_middleware, Instrumentation, Sensor, USER_ID_HEADER};
