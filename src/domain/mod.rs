pub mod allocation;
pub mod demand;
pub mod forecast;
pub mod parameter;
pub mod scenario;
pub mod time_window;
