//! Fan-out of id-affecting operations across object families.
//!
//! Object families register callbacks for the sections they depend on. When a
//! table is renamed, for example, whoever owns sequences can update the table
//! references they store without the table code knowing sequences exist.
//!
//! Registration happens during startup through `&mut self`. Afterwards the
//! registry is shared immutably and may be used concurrently.
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::errors::Result;
use crate::internal::InternalId;
use crate::section::Section;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Rename,
    Delete,
    DeleteCascade,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rename => write!(f, "rename"),
            Self::Delete => write!(f, "delete"),
            Self::DeleteCascade => write!(f, "delete cascade"),
        }
    }
}

/// Arguments passed to every callback.
#[derive(Debug, Clone, Copy)]
pub struct OperationArgs<'a> {
    pub section: Section,
    pub operation: Operation,
    pub original: &'a InternalId,
    /// Only meaningful for renames.
    pub new: &'a InternalId,
}

pub type OperationCallback = Arc<dyn Fn(&OperationArgs<'_>) -> Result<()> + Sync + Send>;

/// Callbacks per section, indexed by section tag.
type CallbackLists = Vec<Vec<OperationCallback>>;

pub struct OperationRegistry {
    performers: CallbackLists,
    validators: CallbackLists,
}

impl OperationRegistry {
    pub fn new() -> Self {
        OperationRegistry {
            performers: vec![Vec::new(); Section::ALL.len()],
            validators: vec![Vec::new(); Section::ALL.len()],
        }
    }

    /// Register a callback that applies side effects for operations on the
    /// given sections.
    pub fn register_performer<F>(&mut self, callback: F, sections: &[Section])
    where
        F: Fn(&OperationArgs<'_>) -> Result<()> + Sync + Send + 'static,
    {
        register(&mut self.performers, Arc::new(callback), sections);
    }

    /// Register a callback that checks whether an operation on the given
    /// sections may proceed.
    ///
    /// Validators must not mutate anything.
    pub fn register_validator<F>(&mut self, callback: F, sections: &[Section])
    where
        F: Fn(&OperationArgs<'_>) -> Result<()> + Sync + Send + 'static,
    {
        register(&mut self.validators, Arc::new(callback), sections);
    }

    /// Run validators for `section` in registration order, stopping at the
    /// first error.
    pub fn validate(
        &self,
        section: Section,
        operation: Operation,
        original: &InternalId,
        new: &InternalId,
    ) -> Result<()> {
        let args = OperationArgs {
            section,
            operation,
            original,
            new,
        };
        run(&self.validators, "validator", &args)
    }

    /// Run performers for `section` in registration order, stopping at the
    /// first error.
    ///
    /// Effects of performers that already ran are not rolled back, so callers
    /// should `validate` first.
    pub fn perform(
        &self,
        section: Section,
        operation: Operation,
        original: &InternalId,
        new: &InternalId,
    ) -> Result<()> {
        let args = OperationArgs {
            section,
            operation,
            original,
            new,
        };
        run(&self.performers, "performer", &args)
    }

    /// Validate, then perform if validation passed.
    pub fn validate_and_perform(
        &self,
        section: Section,
        operation: Operation,
        original: &InternalId,
        new: &InternalId,
    ) -> Result<()> {
        self.validate(section, operation, original, new)?;
        self.perform(section, operation, original, new)
    }

    pub fn performer_count(&self, section: Section) -> usize {
        self.performers[section.as_u8() as usize].len()
    }

    pub fn validator_count(&self, section: Section) -> usize {
        self.validators[section.as_u8() as usize].len()
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let performers: usize = self.performers.iter().map(|l| l.len()).sum();
        let validators: usize = self.validators.iter().map(|l| l.len()).sum();
        f.debug_struct("OperationRegistry")
            .field("performers", &performers)
            .field("validators", &validators)
            .finish()
    }
}

fn register(lists: &mut CallbackLists, callback: OperationCallback, sections: &[Section]) {
    for &section in sections {
        // Null never receives operations.
        if section.is_null() {
            continue;
        }
        lists[section.as_u8() as usize].push(callback.clone());
    }
}

fn run(lists: &CallbackLists, kind: &str, args: &OperationArgs<'_>) -> Result<()> {
    let callbacks = &lists[args.section.as_u8() as usize];
    if callbacks.is_empty() {
        return Ok(());
    }

    debug!(
        section = %args.section,
        operation = %args.operation,
        original = %args.original,
        count = callbacks.len(),
        "running {kind}s"
    );

    for (idx, callback) in callbacks.iter().enumerate() {
        if let Err(e) = callback(args) {
            debug!(%idx, error = %e, "{kind} failed");
            return Err(e);
        }
    }

    Ok(())
}
