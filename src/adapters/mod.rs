//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements   | Connects to                   |
//! |------------|--------------|-------------------------------|
//! | `hardware` | SensorPort   | ESP32 ADC, I2C, touch pad     |
//! |            | ActuatorPort | ESP32 GPIO relay bank         |
//! | `log_sink` | EventSink    | Serial log output             |
//! | `network`  | NetworkPort  | ESP-IDF WiFi soft-AP + UDP/53 |
//! | `nvs`      | ConfigPort   | NVS / in-memory store         |
//! | `time`     | ClockPort    | System clock + esp_timer      |

pub mod hardware;
pub mod log_sink;
pub mod network;
pub mod nvs;
pub mod time;
