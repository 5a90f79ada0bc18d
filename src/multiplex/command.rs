//! A command: an array of binary-safe argument strings plus routing
//! metadata (§3, §4.5).

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandFlags {
    /// The sharding-key argument must be resolved through the alias
    /// registry before partitioning (§4.5).
    pub aliased: bool,
    /// Whether this is a "root command" (the outermost verb, vs. a nested
    /// clause) — used by generators that only rewrite root commands.
    pub root_command: bool,
}

#[derive(Debug, Clone)]
pub struct Command {
    pub args: Vec<String>,
    /// Index into `args` of the sharding-key argument, if any.
    pub sharding_key_index: Option<usize>,
    /// Explicit pre-assigned target slot, bypassing hash computation.
    pub target_slot: Option<u32>,
    pub flags: CommandFlags,
}

impl Command {
    pub fn new(args: Vec<String>, sharding_key_index: usize) -> Self {
        Self {
            args,
            sharding_key_index: Some(sharding_key_index),
            target_slot: None,
            flags: CommandFlags::default(),
        }
    }

    pub fn with_flags(mut self, flags: CommandFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn sharding_key_arg(&self) -> Option<&str> {
        self.sharding_key_index
            .and_then(|i| self.args.get(i))
            .map(|s| s.as_str())
    }
}
