//! Pushdown state machine for context-dependent parsing.
//!
//! Many tokens are ambiguous without context: `style` is a keyword inside an
//! element body but an ordinary tag name elsewhere; `delete` is an operation
//! only inside a specialization. The parser consults the current state, and
//! the state gates which specialization operations are legal.
//!
//! Discipline: strictly push/pop, owned by the parser. The parser enters
//! states through a scoped helper so the pop happens on every exit path,
//! including error recovery.

use crate::ast::DeclKind;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParseState {
    TopLevel,
    InElement,
    InAttr,
    InLocalStyle,
    InStyleRule,
    InLocalScript,
    InTemplateDecl(DeclKind),
    InCustomDecl(DeclKind),
    InSpecialization,
    InOriginBlock,
    InNamespace,
    InConfiguration,
}

impl fmt::Display for ParseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParseState::TopLevel => "top level",
            ParseState::InElement => "element body",
            ParseState::InAttr => "attribute",
            ParseState::InLocalStyle => "local style block",
            ParseState::InStyleRule => "style rule",
            ParseState::InLocalScript => "local script block",
            ParseState::InTemplateDecl(_) => "template declaration",
            ParseState::InCustomDecl(_) => "custom declaration",
            ParseState::InSpecialization => "specialization block",
            ParseState::InOriginBlock => "origin block",
            ParseState::InNamespace => "namespace",
            ParseState::InConfiguration => "configuration block",
        };
        write!(f, "{}", name)
    }
}

/// Context recorded with each pushed state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateContext {
    pub element_tag: Option<String>,
    pub decl_name: Option<String>,
    pub namespace: Option<String>,
    pub local: bool,
}

impl StateContext {
    pub fn element(tag: &str) -> Self {
        StateContext {
            element_tag: Some(tag.to_string()),
            ..Default::default()
        }
    }

    pub fn decl(name: &str) -> Self {
        StateContext {
            decl_name: Some(name.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StateMachine {
    stack: Vec<(ParseState, StateContext)>,
}

impl StateMachine {
    pub fn new() -> Self {
        StateMachine {
            stack: vec![(ParseState::TopLevel, StateContext::default())],
        }
    }

    pub fn push(&mut self, state: ParseState, context: StateContext) {
        self.stack.push((state, context));
    }

    pub fn pop(&mut self) -> ParseState {
        if self.stack.len() > 1 {
            self.stack.pop().map(|(s, _)| s).unwrap_or(ParseState::TopLevel)
        } else {
            ParseState::TopLevel
        }
    }

    pub fn current(&self) -> ParseState {
        self.stack
            .last()
            .map(|(s, _)| *s)
            .unwrap_or(ParseState::TopLevel)
    }

    pub fn current_context(&self) -> &StateContext {
        // The stack always holds the TopLevel sentinel.
        &self.stack.last().expect("state stack is never empty").1
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_in(&self, state: ParseState) -> bool {
        self.stack.iter().any(|(s, _)| *s == state)
    }

    /// Nearest enclosing element tag, if any.
    pub fn enclosing_element(&self) -> Option<&str> {
        self.stack
            .iter()
            .rev()
            .find_map(|(_, ctx)| ctx.element_tag.as_deref())
    }

    /// Whether the current position is inside a custom declaration (at any
    /// depth). `delete` is legal only here or in a specialization.
    pub fn in_custom(&self) -> bool {
        self.stack
            .iter()
            .any(|(s, _)| matches!(s, ParseState::InCustomDecl(_)))
    }

    pub fn in_specialization(&self) -> bool {
        self.is_in(ParseState::InSpecialization)
    }

    // ── operation gating ───────────────────────────────────────────────────

    pub fn allows_delete(&self) -> bool {
        self.in_specialization() || self.in_custom()
    }

    pub fn allows_insert(&self) -> bool {
        self.in_specialization()
            || self
                .stack
                .iter()
                .any(|(s, _)| matches!(s, ParseState::InCustomDecl(DeclKind::Element)))
    }

    pub fn allows_except(&self) -> bool {
        self.is_in(ParseState::InElement)
    }

    pub fn allows_inherit(&self) -> bool {
        self.in_specialization()
            || self
                .stack
                .iter()
                .any(|(s, _)| matches!(s, ParseState::InCustomDecl(_) | ParseState::InTemplateDecl(_)))
            || self.is_in(ParseState::InLocalStyle)
    }

    /// Human-readable trace, innermost last. Appended to diagnostics when
    /// DEBUG_MODE is on.
    pub fn trace(&self) -> String {
        self.stack
            .iter()
            .map(|(s, ctx)| match (&ctx.element_tag, &ctx.decl_name) {
                (Some(tag), _) => format!("{}({})", s, tag),
                (_, Some(name)) => format!("{}({})", s, name),
                _ => s.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" > ")
    }
}
