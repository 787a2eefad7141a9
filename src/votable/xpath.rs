use roxmltree::{Document, Node};
use tracing::trace;

use crate::domain::{VOTABLE_NAMESPACE, VotvError};

/// One location step: `prefix:NAME` with an optional 1-based position.
#[derive(Debug, PartialEq)]
struct Step<'e> {
    prefix: Option<&'e str>,
    name: &'e str,
    position: Option<usize>,
}

impl<'e> Step<'e> {
    fn parse(step: &'e str) -> Result<Self, VotvError> {
        let (qname, position) = match step.split_once('[') {
            Some((qname, predicate)) => {
                let position = predicate
                    .strip_suffix(']')
                    .and_then(|p| p.trim().parse::<usize>().ok())
                    .filter(|&p| p > 0)
                    .ok_or_else(|| VotvError::InvalidXPath(step.to_string()))?;
                (qname, Some(position))
            }
            None => (step, None),
        };
        let (prefix, name) = match qname.split_once(':') {
            Some((prefix, name)) => (Some(prefix), name),
            None => (None, qname),
        };
        if name.is_empty() {
            return Err(VotvError::InvalidXPath(step.to_string()));
        }
        Ok(Step {
            prefix,
            name,
            position,
        })
    }
}

/// Evaluates child-axis XPath expressions against a namespaced VOTable
/// document. Unprefixed steps are bound to `default_namespace_prefix`, which
/// resolves to the namespace of the document element.
pub struct VOTableXPathEvaluator<'a, 'input> {
    document: &'a Document<'input>,
    default_namespace_prefix: String,
}

impl<'a, 'input> VOTableXPathEvaluator<'a, 'input> {
    pub fn new(document: &'a Document<'input>, default_namespace_prefix: impl Into<String>) -> Self {
        Self {
            document,
            default_namespace_prefix: default_namespace_prefix.into(),
        }
    }

    /// Prepend the default namespace prefix to every unprefixed step of the
    /// expression.
    pub fn prepare_path(&self, expression: &str) -> String {
        expression
            .split('/')
            .filter(|item| !item.is_empty())
            .map(|item| {
                let qname = item.split_once('[').map_or(item, |(qname, _)| qname);
                if qname.contains(':') {
                    format!("/{item}")
                } else {
                    format!("/{}:{}", self.default_namespace_prefix, item)
                }
            })
            .collect()
    }

    /// Evaluate the expression from the document root, returning matching
    /// elements in document order.
    pub fn evaluate(&self, expression: &str) -> Result<Vec<Node<'a, 'input>>, VotvError> {
        self.evaluate_from(self.document.root(), expression)
    }

    /// Evaluate the expression relative to `context`.
    pub fn evaluate_from(
        &self,
        context: Node<'a, 'input>,
        expression: &str,
    ) -> Result<Vec<Node<'a, 'input>>, VotvError> {
        let path = self.prepare_path(expression);
        let mut found = vec![context];

        for raw_step in path.split('/').filter(|s| !s.is_empty()) {
            let step = Step::parse(raw_step)?;
            let namespace = self.resolve(step.prefix)?;

            found = found
                .into_iter()
                .flat_map(|node| {
                    let matching = node.children().filter(|child| {
                        child.is_element()
                            && child.tag_name().name() == step.name
                            && child.tag_name().namespace() == namespace.as_deref()
                    });
                    match step.position {
                        Some(p) => matching.skip(p - 1).take(1).collect::<Vec<_>>(),
                        None => matching.collect::<Vec<_>>(),
                    }
                })
                .collect();

            if found.is_empty() {
                break;
            }
        }

        trace!("XPath {path} matched {} nodes", found.len());
        Ok(found)
    }

    fn resolve(&self, prefix: Option<&str>) -> Result<Option<String>, VotvError> {
        let root = self.document.root_element();
        match prefix {
            None => Ok(None),
            Some(p) if p == self.default_namespace_prefix => {
                Ok(root.tag_name().namespace().map(str::to_string))
            }
            Some("votable") => Ok(Some(VOTABLE_NAMESPACE.to_string())),
            Some(p) => root
                .lookup_namespace_uri(Some(p))
                .map(|ns| Some(ns.to_string()))
                .ok_or_else(|| VotvError::UnknownPrefix(p.to_string())),
        }
    }
}
