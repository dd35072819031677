//! Library components, link types, and the expected-outcome matrix.
//!
//! The matrix encodes the dependency relationships between the library's
//! linkable components:
//!
//! ```text
//! core:        (no component dependency)
//! extra:       core
//! pthreads:    core
//! openssl:     core, openssl
//! ```
//!
//! Code written against component X builds and runs only when the linked
//! component's transitive dependencies cover X. The matrix is authored once
//! and never mutated at runtime.

use std::fmt;

/// A named, independently linkable subset of the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    Core,
    Extra,
    Openssl,
    Pthreads,
}

impl Component {
    pub const ALL: [Component; 4] = [
        Component::Core,
        Component::Extra,
        Component::Openssl,
        Component::Pthreads,
    ];

    /// The name passed to the build tool (`find_package` component name).
    pub fn as_str(self) -> &'static str {
        match self {
            Component::Core => "core",
            Component::Extra => "extra",
            Component::Openssl => "openssl",
            Component::Pthreads => "pthreads",
        }
    }

    /// Components pulled in transitively when linking `self`.
    fn depends_on(self) -> &'static [Component] {
        match self {
            Component::Core => &[],
            Component::Extra | Component::Openssl | Component::Pthreads => &[Component::Core],
        }
    }

    /// Whether code written against `code` links and runs when only `link`
    /// (plus its transitive dependencies) is linked.
    pub fn satisfies(link: Component, code: Component) -> bool {
        link == code || link.depends_on().contains(&code)
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the library is linked statically or dynamically into the probe
/// executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkType {
    #[default]
    Shared,
    Static,
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LinkType::Shared => "shared",
            LinkType::Static => "static",
        })
    }
}

/// Result of one link-matrix check. Configuration, compile, link and runtime
/// failures are all collapsed into `Failure`; the check only cares whether
/// the dependency boundary was enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn from_ok(ok: bool) -> Self {
        if ok { Outcome::Success } else { Outcome::Failure }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
        })
    }
}

/// One entry of the link matrix: link the probe against `link`, compile
/// source written for `code`, and expect `expected`.
///
/// `None` means "all components": the component directive is passed to the
/// build tool as an empty string, which links (or compiles for) the whole
/// library.
#[derive(Debug, Clone, Copy)]
pub struct LinkCase {
    pub link: Option<Component>,
    pub code: Option<Component>,
    pub expected: Outcome,
    /// Only the `core`/`core` case runs in the shipped configuration; the
    /// rest of the lattice is kept as explicit, separately toggleable cases.
    pub enabled: bool,
    /// The `pthreads` component does not exist on Windows.
    pub unix_only: bool,
}

impl LinkCase {
    const fn new(link: Component, code: Component, expected: Outcome) -> Self {
        let unix_only = matches!(link, Component::Pthreads) || matches!(code, Component::Pthreads);
        LinkCase {
            link: Some(link),
            code: Some(code),
            expected,
            enabled: false,
            unix_only,
        }
    }

    /// The "link everything, compile for everything" case.
    const fn all(expected: Outcome) -> Self {
        LinkCase {
            link: None,
            code: None,
            expected,
            enabled: false,
            unix_only: false,
        }
    }

    const fn enabled(mut self) -> Self {
        self.enabled = true;
        self
    }

    pub fn runs_on_this_platform(&self) -> bool {
        !self.unix_only || !cfg!(windows)
    }

    /// Case name used in reports, e.g. `link_core_code_extra` or
    /// `link_all_code_all`.
    pub fn name(&self) -> String {
        format!(
            "link_{}_code_{}",
            selection_name(self.link),
            selection_name(self.code)
        )
    }
}

/// Display name for a component selection; the all-components selection has
/// no component of its own.
pub fn selection_name(selection: Option<Component>) -> &'static str {
    match selection {
        Some(component) => component.as_str(),
        None => "all",
    }
}

use Component::{Core, Extra, Openssl, Pthreads};
use Outcome::{Failure, Success};

/// The full dependency lattice, every (link, code) pair exactly once, plus
/// the all-components case.
pub const LINK_MATRIX: [LinkCase; 17] = [
    LinkCase::new(Core, Core, Success).enabled(),
    LinkCase::all(Success),
    LinkCase::new(Extra, Extra, Success),
    LinkCase::new(Openssl, Openssl, Success),
    LinkCase::new(Extra, Core, Success),
    LinkCase::new(Openssl, Core, Success),
    LinkCase::new(Core, Extra, Failure),
    LinkCase::new(Core, Openssl, Failure),
    LinkCase::new(Extra, Openssl, Failure),
    LinkCase::new(Openssl, Extra, Failure),
    LinkCase::new(Pthreads, Pthreads, Success),
    LinkCase::new(Pthreads, Core, Success),
    LinkCase::new(Core, Pthreads, Failure),
    LinkCase::new(Pthreads, Extra, Failure),
    LinkCase::new(Extra, Pthreads, Failure),
    LinkCase::new(Pthreads, Openssl, Failure),
    LinkCase::new(Openssl, Pthreads, Failure),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_covers_every_pair_once() {
        for link in Component::ALL {
            for code in Component::ALL {
                let count = LINK_MATRIX
                    .iter()
                    .filter(|c| c.link == Some(link) && c.code == Some(code))
                    .count();
                assert_eq!(count, 1, "pair ({link}, {code}) appears {count} times");
            }
        }
    }

    #[test]
    fn matrix_agrees_with_dependency_lattice() {
        for case in &LINK_MATRIX {
            let (Some(link), Some(code)) = (case.link, case.code) else {
                continue;
            };
            let expected = Outcome::from_ok(Component::satisfies(link, code));
            assert_eq!(
                case.expected, expected,
                "case {} disagrees with the lattice",
                case.name()
            );
        }
    }

    #[test]
    fn only_core_core_is_enabled_by_default() {
        let enabled: Vec<_> = LINK_MATRIX.iter().filter(|c| c.enabled).collect();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].link, Some(Core));
        assert_eq!(enabled[0].code, Some(Core));
        assert_eq!(enabled[0].expected, Success);
    }

    #[test]
    fn all_components_case_is_preserved_as_disabled() {
        let all: Vec<_> = LINK_MATRIX
            .iter()
            .filter(|c| c.link.is_none() || c.code.is_none())
            .collect();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].link, None);
        assert_eq!(all[0].code, None);
        assert_eq!(all[0].expected, Success);
        assert!(!all[0].enabled);
        assert!(all[0].runs_on_this_platform());
        assert_eq!(all[0].name(), "link_all_code_all");
    }

    #[test]
    fn pthreads_cases_are_unix_only() {
        for case in &LINK_MATRIX {
            let touches_pthreads =
                case.link == Some(Pthreads) || case.code == Some(Pthreads);
            assert_eq!(case.unix_only, touches_pthreads, "{}", case.name());
        }
    }

    #[test]
    fn component_names_match_find_package_components() {
        assert_eq!(Core.as_str(), "core");
        assert_eq!(Extra.as_str(), "extra");
        assert_eq!(Openssl.as_str(), "openssl");
        assert_eq!(Pthreads.as_str(), "pthreads");
    }
}
