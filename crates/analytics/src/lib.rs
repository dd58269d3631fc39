//! Periodic journey analysis — drop-off hotspot detection, conversion-path
//! mining, optimization generation, and the interval scheduler that runs
//! them against the journey store.

pub mod dropoff;
pub mod optimization;
pub mod paths;
pub mod scheduler;

pub use dropoff::DropOffAnalyzer;
pub use optimization::OptimizationGenerator;
pub use paths::ConversionPathMiner;
pub use scheduler::AnalysisScheduler;
