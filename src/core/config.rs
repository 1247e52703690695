#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Largest accepted page size. Big enough that a full export is one page.
    pub max_page_size: usize,

    // Phone index shape
    pub phone_prefix_min: usize,
    pub phone_prefix_max: usize,
    pub phone_suffix_len: usize,

    pub tag_delimiter: char,

    // Index build
    pub build_in_background: bool,
    pub build_chunk_size: usize,
    pub index_threads: usize,

    // Request path
    pub parallel_filter_threshold: usize,
    pub scan_chunk_size: usize,

    // Page result cache
    pub result_cache_capacity: usize,
    pub result_cache_max_page_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_page_size: 5_000_000,

            phone_prefix_min: 3,
            phone_prefix_max: 6,
            phone_suffix_len: 4,

            tag_delimiter: ',',

            build_in_background: true,
            build_chunk_size: 16 * 1024,         // records per build task
            index_threads: num_cpus::get(),

            parallel_filter_threshold: 64 * 1024, // below this filter sequentially
            scan_chunk_size: 32 * 1024,           // cancellation check interval

            result_cache_capacity: 256,
            result_cache_max_page_size: 500,
        }
    }
}

impl EngineConfig {
    /// Build the index inline during `open`/`reload`.
    pub fn foreground() -> Self {
        EngineConfig {
            build_in_background: false,
            ..EngineConfig::default()
        }
    }
}
