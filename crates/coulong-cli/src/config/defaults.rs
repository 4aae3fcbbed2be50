use coulong::engine::config::{DEFAULT_TABLE_BITS, DEFAULT_TABLE_INNER};

pub struct DefaultsConfig {
    pub skin: f64,
    pub passes: usize,
    pub energy: bool,
    pub per_atom: bool,
    pub table_bits: u32,
    pub table_inner: f64,
    pub newton_pair: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            skin: 2.0,
            passes: 1,
            energy: true,
            per_atom: false,
            table_bits: DEFAULT_TABLE_BITS,
            table_inner: DEFAULT_TABLE_INNER,
            newton_pair: true,
        }
    }
}
