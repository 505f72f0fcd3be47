#[derive(Clone, Default)]
pub struct NodeFlags {
    pub disable_request_loop: bool,
    pub disable_activate_successors: bool,
    pub disable_backlog_population: bool,
}

impl NodeFlags {
    pub fn new() -> Self {
        Default::default()
    }
}
