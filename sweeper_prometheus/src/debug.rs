/// Counters collected over one sweep, logged when it finishes
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SweepStats {
    /// Metric families in the gateway's exposition
    pub families: usize,
    /// Samples of the push-time gauge, one per pushed group
    pub groups: usize,
    pub stale: usize,
    pub deleted: usize,
}

impl SweepStats {
    pub fn publish(&self) {
        tracing::info!(
            families = self.families,
            groups = self.groups,
            stale = self.stale,
            deleted = self.deleted,
            "sweep finished"
        );
    }
}
