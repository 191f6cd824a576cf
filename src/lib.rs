//! sbcmon: single-board computer metrics for Home Assistant over MQTT
//!
//! Each run samples a fixed set of host metrics (CPU load and temperature,
//! disk, memory and swap usage, core voltage, clock speed, uptime),
//! publishes Home Assistant discovery configs for them and then the values,
//! either one topic per metric or as a single JSON document. Scheduling is
//! left to cron or a systemd timer.
//!
//! ## Modules
//!
//! * `config`: TOML configuration, validation with `validator`, and the
//!   `print_*!` macros used before logging is up.
//!
//! * `core`: The run itself:
//!   - Metric table and values (`metric`)
//!   - Probes and their registry (`collectors`)
//!   - Snapshot assembly, discovery configs, topic layout
//!   - The `Transport` seam, `Publisher` and `Executor`
//!
//! * `logger`: `tracing` subscriber setup with console output (compact,
//!   pretty, JSON) and optional systemd journald.

pub mod config;
pub mod core;
pub mod logger;
