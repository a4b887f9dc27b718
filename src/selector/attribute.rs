//! Attribute test evaluation.

use crate::scanner::chars::is_html_whitespace;
use crate::tree::{Document, NodeId};

use super::clause::{AttributeSelectorType, AttributeTest};

/// Evaluates `test` against `element`.
///
/// A missing attribute satisfies only `NotExists` and `NotEquals`. The
/// parser stores `"\0"` as the operand for an empty `^=`, `*=` or `$=`
/// value, which no attribute value contains, so those never match.
#[must_use]
pub fn matches(doc: &Document, element: NodeId, test: &AttributeTest) -> bool {
    use AttributeSelectorType as Op;

    let Some(value) = doc.attribute(element, &test.name) else {
        return matches!(test.operator, Op::NotExists | Op::NotEquals);
    };
    let cmp = test.comparison;
    let operand = test.value.as_str();
    match test.operator {
        Op::Exists => true,
        Op::NotExists => false,
        Op::Equals => cmp.equals(value, operand),
        Op::NotEquals => !cmp.equals(value, operand),
        Op::StartsWith => cmp.starts_with(value, operand),
        Op::EndsWith => cmp.ends_with(value, operand),
        Op::Contains => cmp.contains(value, operand),
        Op::ContainsWord => value
            .split(is_html_whitespace)
            .any(|word| !word.is_empty() && cmp.equals(word, operand)),
        Op::StartsWithOrHyphen => {
            cmp.equals(value, operand)
                || value
                    .split_once('-')
                    .is_some_and(|(head, _)| cmp.equals(head, operand))
        }
    }
}
