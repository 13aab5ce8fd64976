//! Composed enhancement transformation over one candidate class.
//!
//! Two passes run in a fixed order, the entity pass before the query-bean
//! pass, so the query-bean pass observes the entity pass's output. Pass
//! failures are captured in order of occurrence and attached to the
//! outcome; they never propagate and never abort sibling candidates.

use crate::classpath::{ClasspathIndex, join_classpath};
use crate::error::EnhanceError;
use crate::sink::TransformLog;

/// One captured pass failure for one class.
#[derive(Debug, Clone)]
pub struct TransformFailure {
    pub pass: &'static str,
    pub class_name: String,
    pub message: String,
}

/// Result of running the composed passes over one candidate. `bytes` is
/// present iff at least one pass rewrote the class.
#[derive(Debug)]
pub struct EnhancementOutcome {
    pub enhanced: bool,
    pub bytes: Option<Vec<u8>>,
    pub failures: Vec<TransformFailure>,
}

pub trait ClassTransformer {
    fn pass_name(&self) -> &'static str;

    /// Rewritten bytes, or `None` when the class is not touched by this
    /// pass. `index` serves auxiliary class lookups (superclasses etc.)
    /// and is scoped to the current candidate.
    fn transform(
        &self,
        index: &ClasspathIndex<'_>,
        class_name: &str,
        bytes: &[u8],
        log: &mut TransformLog,
    ) -> Result<Option<Vec<u8>>, EnhanceError>;
}

pub struct CombinedTransform {
    passes: Vec<Box<dyn ClassTransformer>>,
}

impl CombinedTransform {
    /// Entity pass first, query-bean pass second. The order is fixed: the
    /// query-bean pass must see the entity pass's lineage.
    pub fn new(entity: Box<dyn ClassTransformer>, query_bean: Box<dyn ClassTransformer>) -> Self {
        Self {
            passes: vec![entity, query_bean],
        }
    }

    pub fn apply(
        &self,
        index: &ClasspathIndex<'_>,
        class_name: &str,
        original: &[u8],
        log: &mut TransformLog,
    ) -> EnhancementOutcome {
        log.verbose(&format!("processing class: {class_name}"));
        log.verbose(&format!("classpath: {}", join_classpath(index.entries())));

        let mut current: Option<Vec<u8>> = None;
        let mut failures = Vec::new();

        for pass in &self.passes {
            let input = current.as_deref().unwrap_or(original);
            match pass.transform(index, class_name, input, log) {
                Ok(Some(out)) => {
                    log.verbose(&format!("{} pass rewrote {class_name}", pass.pass_name()));
                    current = Some(out);
                }
                Ok(None) => {}
                Err(e) => failures.push(TransformFailure {
                    pass: pass.pass_name(),
                    class_name: class_name.to_string(),
                    message: e.to_string(),
                }),
            }
        }

        EnhancementOutcome {
            enhanced: current.is_some(),
            bytes: current,
            failures,
        }
    }
}
