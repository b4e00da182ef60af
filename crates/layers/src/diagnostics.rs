use std::collections::BTreeMap;

use crate::validate::RingValidationReport;

/// Why a polygon part produced no mesh.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SkipReason {
    NoOuterRing,
    Degenerate,
    TriangulationFailed,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::NoOuterRing => "no_outer_ring",
            SkipReason::Degenerate => "degenerate",
            SkipReason::TriangulationFailed => "triangulation_failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticEvent {
    RingValidated {
        feature_id: String,
        /// 0 for the outer ring, `1 + hole index` for holes.
        ring: usize,
        part: usize,
        report: RingValidationReport,
    },
    PartSkipped {
        feature_id: String,
        part: usize,
        reason: SkipReason,
    },
    HoleFallback {
        feature_id: String,
        hole: usize,
    },
    ProjectionFallback {
        feature_id: String,
        part: usize,
        edge_ratio: f64,
    },
    CacheHit {
        feature_id: String,
    },
    CacheMiss {
        feature_id: String,
    },
}

impl DiagnosticEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DiagnosticEvent::RingValidated { .. } => "ring_validated",
            DiagnosticEvent::PartSkipped { .. } => "part_skipped",
            DiagnosticEvent::HoleFallback { .. } => "hole_fallback",
            DiagnosticEvent::ProjectionFallback { .. } => "projection_fallback",
            DiagnosticEvent::CacheHit { .. } => "cache_hit",
            DiagnosticEvent::CacheMiss { .. } => "cache_miss",
        }
    }

    pub fn feature_id(&self) -> &str {
        match self {
            DiagnosticEvent::RingValidated { feature_id, .. }
            | DiagnosticEvent::PartSkipped { feature_id, .. }
            | DiagnosticEvent::HoleFallback { feature_id, .. }
            | DiagnosticEvent::ProjectionFallback { feature_id, .. }
            | DiagnosticEvent::CacheHit { feature_id }
            | DiagnosticEvent::CacheMiss { feature_id } => feature_id,
        }
    }
}

/// Receiver for pipeline diagnostics.
pub trait DiagnosticsSink {
    fn record(&mut self, event: &DiagnosticEvent);
}

pub(crate) fn emit(sink: &mut Option<&mut dyn DiagnosticsSink>, event: DiagnosticEvent) {
    if let Some(sink) = sink.as_deref_mut() {
        sink.record(&event);
    }
}

/// Collects every event and keeps deterministic counters.
///
/// Counters are keyed by event name; removed duplicates, removed collinear
/// vertices and self-intersections from validation reports are summed
/// under their own names.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DiagnosticsLog {
    events: Vec<DiagnosticEvent>,
    counters: BTreeMap<String, u64>,
}

impl DiagnosticsLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[DiagnosticEvent] {
        &self.events
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn counters(&self) -> &BTreeMap<String, u64> {
        &self.counters
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.counters.clear();
    }

    fn inc_counter(&mut self, name: &str, by: u64) {
        if by == 0 {
            return;
        }
        *self.counters.entry(name.to_string()).or_insert(0) += by;
    }
}

impl DiagnosticsSink for DiagnosticsLog {
    fn record(&mut self, event: &DiagnosticEvent) {
        self.inc_counter(event.name(), 1);
        if let DiagnosticEvent::RingValidated { report, .. } = event {
            self.inc_counter("removed_duplicates", report.removed_duplicates as u64);
            self.inc_counter("removed_collinear", report.removed_collinear as u64);
            self.inc_counter("self_intersections", report.self_intersections as u64);
        }
        self.events.push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::{DiagnosticEvent, DiagnosticsLog, DiagnosticsSink, SkipReason, emit};
    use crate::validate::RingValidationReport;
    use pretty_assertions::assert_eq;

    #[test]
    fn counters_are_sorted_and_summed() {
        let mut log = DiagnosticsLog::new();
        log.record(&DiagnosticEvent::CacheMiss {
            feature_id: "fr".to_string(),
        });
        log.record(&DiagnosticEvent::RingValidated {
            feature_id: "fr".to_string(),
            ring: 0,
            part: 0,
            report: RingValidationReport {
                removed_duplicates: 2,
                removed_collinear: 0,
                self_intersections: 1,
            },
        });
        log.record(&DiagnosticEvent::CacheMiss {
            feature_id: "de".to_string(),
        });

        let names: Vec<(&str, u64)> = log.counters().iter().map(|(k, v)| (k.as_str(), *v)).collect();
        assert_eq!(
            names,
            vec![
                ("cache_miss", 2),
                ("removed_duplicates", 2),
                ("ring_validated", 1),
                ("self_intersections", 1),
            ]
        );
        assert_eq!(log.events().len(), 3);
        assert_eq!(log.events()[2].feature_id(), "de");
    }

    #[test]
    fn emit_without_sink_is_a_no_op() {
        let mut none: Option<&mut dyn DiagnosticsSink> = None;
        emit(
            &mut none,
            DiagnosticEvent::PartSkipped {
                feature_id: "x".to_string(),
                part: 0,
                reason: SkipReason::Degenerate,
            },
        );

        let mut log = DiagnosticsLog::new();
        let mut some: Option<&mut dyn DiagnosticsSink> = Some(&mut log);
        emit(
            &mut some,
            DiagnosticEvent::HoleFallback {
                feature_id: "x".to_string(),
                hole: 1,
            },
        );
        assert_eq!(log.counter("hole_fallback"), 1);
        assert_eq!(SkipReason::Degenerate.as_str(), "degenerate");
    }
}
