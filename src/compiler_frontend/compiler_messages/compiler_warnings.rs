use saying::say;

#[derive(Clone, Debug, PartialEq)]
pub struct CompilerWarning {
    pub msg: String,
    pub warning_kind: WarningKind,

    // Id of the set the offending node belongs to, when known
    pub set_id: Option<String>,
}

impl CompilerWarning {
    pub fn new(msg: impl Into<String>, warning_kind: WarningKind) -> CompilerWarning {
        CompilerWarning {
            msg: msg.into(),
            warning_kind,
            set_id: None,
        }
    }

    pub fn in_set(mut self, set_id: impl Into<String>) -> Self {
        self.set_id = Some(set_id.into());
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WarningKind {
    UnresolvedOperation,
    UnresolvedPrimitive,
    UnresolvedSet,
    AmbiguousPrimitiveMatch,
    MissingQueryFunction,
    UnreachableBlock,
}

pub fn print_formatted_warning(w: CompilerWarning) {
    say!(Yellow "WARNING: ");
    if let Some(set_id) = &w.set_id {
        say!(Dark Yellow "In set ", set_id);
    }

    match w.warning_kind {
        WarningKind::UnresolvedOperation => {
            say!("No transformer matches operation ", w.msg);
        }
        WarningKind::UnresolvedPrimitive => {
            say!("No transformer matches primitive ", w.msg);
        }
        WarningKind::UnresolvedSet => {
            say!("No transformer for set ", w.msg);
        }
        WarningKind::AmbiguousPrimitiveMatch => {
            say!("Ambiguous primitive match resolved by specificity: ", w.msg);
        }
        WarningKind::MissingQueryFunction => {
            say!("No query function transformer registered: ", w.msg);
        }
        WarningKind::UnreachableBlock => {
            say!("Block is not connected to the source and was skipped: ", w.msg);
        }
    }
}
