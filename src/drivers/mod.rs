pub mod actuator;
pub mod camera;
pub mod ultrasonic;
