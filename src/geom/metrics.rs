//! Opt-in timing hooks for welding, subdivision and curve refinement.
//!
//! Timing is only collected when the `mesh_engine_metrics` feature is enabled
//! and the target is not WASM (`std::time::Instant` is unavailable there).
//! Otherwise every call is a plain passthrough and [`GeomMetrics::end`]
//! returns `None`.
//!
//! # Usage
//!
//! ```ignore
//! use subd_engine::geom::{GeomMetrics, TimingBucket};
//!
//! let mut metrics = GeomMetrics::default();
//! metrics.begin();
//!
//! let welded = metrics.time(TimingBucket::Welding, || weld_mesh(&mesh, 1e-6));
//!
//! if let Some(report) = metrics.end() {
//!     println!("Welding: {} ns", report.welding_ns);
//! }
//! ```

/// Categories for timing the phases of a refinement run.
///
/// Each bucket accumulates time across multiple calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimingBucket {
    /// Vertex welding.
    Welding,
    /// Edge topology construction.
    Topology,
    /// Vertex repositioning, midpoint insertion and triangle splitting.
    Subdivision,
    /// Chaikin corner cutting.
    CurveRefinement,
    /// Vertex normal recomputation.
    Normals,
}

/// Timing report with nanosecond precision for each bucket.
///
/// All fields are cumulative.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GeomTimingReport {
    pub welding_ns: u64,
    pub topology_ns: u64,
    pub subdivision_ns: u64,
    pub curve_refinement_ns: u64,
    pub normals_ns: u64,
}

impl GeomTimingReport {
    /// Returns the total time across all buckets in nanoseconds.
    #[must_use]
    pub fn total_ns(&self) -> u64 {
        self.welding_ns
            .saturating_add(self.topology_ns)
            .saturating_add(self.subdivision_ns)
            .saturating_add(self.curve_refinement_ns)
            .saturating_add(self.normals_ns)
    }

    /// Returns the total time in milliseconds (for display purposes).
    #[must_use]
    pub fn total_ms(&self) -> f64 {
        self.total_ns() as f64 / 1_000_000.0
    }

    fn bucket_mut(&mut self, bucket: TimingBucket) -> &mut u64 {
        match bucket {
            TimingBucket::Welding => &mut self.welding_ns,
            TimingBucket::Topology => &mut self.topology_ns,
            TimingBucket::Subdivision => &mut self.subdivision_ns,
            TimingBucket::CurveRefinement => &mut self.curve_refinement_ns,
            TimingBucket::Normals => &mut self.normals_ns,
        }
    }

    /// Adds nanoseconds to the specified bucket, saturating at `u64::MAX`.
    pub fn add(&mut self, bucket: TimingBucket, nanos: u64) {
        let slot = self.bucket_mut(bucket);
        *slot = slot.saturating_add(nanos);
    }
}

/// Accumulator for timing geometry operations.
///
/// Call [`begin`](Self::begin) to reset, wrap work with [`time`](Self::time),
/// and call [`end`](Self::end) to retrieve the report.
#[derive(Debug, Default)]
pub struct GeomMetrics {
    #[cfg(all(feature = "mesh_engine_metrics", not(target_arch = "wasm32")))]
    report: GeomTimingReport,
}

impl GeomMetrics {
    /// Resets all timing counters to zero.
    pub fn begin(&mut self) {
        #[cfg(all(feature = "mesh_engine_metrics", not(target_arch = "wasm32")))]
        {
            self.report = GeomTimingReport::default();
        }
    }

    /// Returns the accumulated timing report, or `None` if metrics are disabled.
    #[must_use]
    pub fn end(&self) -> Option<GeomTimingReport> {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "mesh_engine_metrics", not(target_arch = "wasm32")))] {
                Some(self.report.clone())
            } else {
                None
            }
        }
    }

    /// Times the execution of `f` and accumulates the elapsed time in `bucket`.
    ///
    /// When metrics are disabled, this simply calls `f()`.
    pub fn time<R>(&mut self, bucket: TimingBucket, f: impl FnOnce() -> R) -> R {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "mesh_engine_metrics", not(target_arch = "wasm32")))] {
                let start = std::time::Instant::now();
                let result = f();
                let nanos = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);
                self.report.add(bucket, nanos);
                result
            } else {
                let _ = bucket;
                f()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_report_total() {
        let mut report = GeomTimingReport::default();
        report.add(TimingBucket::Welding, 1000);
        report.add(TimingBucket::Subdivision, 2000);
        report.add(TimingBucket::Subdivision, 3000);
        assert_eq!(report.subdivision_ns, 5000);
        assert_eq!(report.total_ns(), 6000);
        assert!((report.total_ms() - 0.006).abs() < 1e-9);
    }

    #[test]
    fn test_add_saturates() {
        let mut report = GeomTimingReport::default();
        report.add(TimingBucket::Normals, u64::MAX);
        report.add(TimingBucket::Normals, 1);
        assert_eq!(report.normals_ns, u64::MAX);
        assert_eq!(report.total_ns(), u64::MAX);
    }

    #[test]
    fn test_time_returns_closure_result() {
        let mut metrics = GeomMetrics::default();
        metrics.begin();
        let result = metrics.time(TimingBucket::CurveRefinement, || 42);
        assert_eq!(result, 42);
        let report = metrics.end();
        assert_eq!(
            report.is_some(),
            cfg!(all(feature = "mesh_engine_metrics", not(target_arch = "wasm32")))
        );
    }
}
