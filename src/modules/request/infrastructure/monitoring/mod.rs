pub mod performance_monitor;

// Re-export main types
pub use performance_monitor::PerformanceMonitor;
