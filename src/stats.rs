/// Engine counters, kept for operators and tests.
///
/// All counters are advisory; none participates in protocol decisions except
/// `num_pending`, which throttles pull amplification and is decayed by the
/// purge loop.
#[derive(Debug, Default, Clone)]
pub struct EngineStats {
    /// Blobs pushed or served to peers.
    pub total_sent: u32,
    /// Q frames received from the network.
    pub total_recv: u32,
    /// Blobs admitted into the store, local originations included.
    pub total_added: u32,
    /// Q frames already present on arrival.
    pub duplicates: u32,
    /// Pending-table probes.
    pub lookups32: u32,
    /// Pending-table inserts.
    pub adds32: u32,
    /// Pending-table probes that hit a different short-hash.
    pub collisions32: u32,
    /// Frames dropped for exceeding the lag budget.
    pub max_lag_drops: u32,
    /// Frames dropped for carrying a future timestamp.
    pub future_drops: u32,
    /// Q frames failing the admission rule.
    pub pow_rejects: u32,
    /// Blobs stored without full indexing because an axis was full.
    pub index_full_errors: u32,
    /// Sum of receive lags of admitted quotes, seconds.
    pub total_lag: i64,
    /// Outstanding pull requests, decayed 0.5% per purge advance.
    pub num_pending: i32,
}
