use crate::core::registry::RegistrySnapshot;
use crate::core::validator::declared;
use crate::models::error::SError;
use crate::models::mod_dto::{ErrorType, UnsafeLocalMod};
use crate::models::transition::FixAction;
use indexmap::IndexSet;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// "Requires" graph over the installed mods of one snapshot.
///
/// Edges only point at installed mods; declared dependencies that are not
/// installed are validation errors, not graph edges. Cycles are allowed.
pub struct DependencyGraph<'a> {
    snapshot: &'a RegistrySnapshot,
    dependents: BTreeMap<&'a str, BTreeSet<&'a str>>,
}

impl<'a> DependencyGraph<'a> {
    pub fn new(snapshot: &'a RegistrySnapshot) -> Self {
        let mut dependents: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for m in snapshot.valid_mods() {
            for dep in declared(&m.manifest.dependencies, &m.unique_name) {
                if snapshot.is_installed(dep) {
                    dependents.entry(dep).or_default().insert(m.unique_name.as_str());
                }
            }
        }
        Self {
            snapshot,
            dependents,
        }
    }

    /// Installed dependencies of `unique_name`, in declaration order.
    pub fn dependencies(&self, unique_name: &str) -> Vec<&'a str> {
        self.snapshot
            .find(unique_name)
            .map(|m| {
                declared(&m.manifest.dependencies, &m.unique_name)
                    .filter(|dep| self.snapshot.is_installed(dep))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Mods that declare `unique_name` as a dependency and are enabled.
    pub fn enabled_dependents(&self, unique_name: &str) -> impl Iterator<Item = &'a str> + '_ {
        self.dependents
            .get(unique_name)
            .into_iter()
            .flatten()
            .copied()
            .filter(|d| self.snapshot.is_enabled(d))
    }

    /// Disabled mods that must be enabled for `root` to have no disabled
    /// dependencies, dependencies before dependents. Expansion stops at mods
    /// that are already enabled. `root` itself is never included.
    pub fn closure_to_enable(&self, root: &str) -> IndexSet<String> {
        let mut visited = HashSet::from([root.to_string()]);
        let mut out = IndexSet::new();
        self.collect_disabled(root, &mut visited, &mut out);
        out
    }

    fn collect_disabled(&self, node: &str, visited: &mut HashSet<String>, out: &mut IndexSet<String>) {
        for dep in self.dependencies(node) {
            if !visited.insert(dep.to_string()) || self.snapshot.is_enabled(dep) {
                continue;
            }
            self.collect_disabled(dep, visited, out);
            out.insert(dep.to_string());
        }
    }

    pub fn has_disabled_deps(&self, root: &str) -> bool {
        !self.closure_to_enable(root).is_empty()
    }

    /// Enabled dependencies of `root` that nothing outside the request still
    /// needs, ordered dependents before dependencies. `root` is excluded.
    pub fn closure_to_disable(&self, root: &str) -> IndexSet<String> {
        // Every enabled mod reachable from root through enabled mods.
        let mut closure: BTreeSet<&str> = BTreeSet::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            for dep in self.dependencies(node) {
                if dep != root && self.snapshot.is_enabled(dep) && closure.insert(dep) {
                    stack.push(dep);
                }
            }
        }

        // Shrink until no member has an enabled dependent outside closure + root.
        loop {
            let needed: Vec<&str> = closure
                .iter()
                .copied()
                .filter(|member| {
                    self.enabled_dependents(member)
                        .any(|d| d != root && !closure.contains(d))
                })
                .collect();
            if needed.is_empty() {
                break;
            }
            for member in needed {
                closure.remove(member);
            }
        }

        self.dependents_first(&closure)
    }

    /// Orders `members` so each comes after all of its dependents in the set.
    /// Members stuck in a cycle are appended by name.
    fn dependents_first(&self, members: &BTreeSet<&str>) -> IndexSet<String> {
        let mut ordered = IndexSet::new();
        let mut remaining: BTreeSet<&str> = members.clone();

        loop {
            let ready: Vec<&str> = remaining
                .iter()
                .copied()
                .filter(|m| {
                    self.dependents
                        .get(*m)
                        .into_iter()
                        .flatten()
                        .all(|d| *d == *m || !remaining.contains(*d))
                })
                .collect();
            if ready.is_empty() {
                break;
            }
            for m in ready {
                remaining.remove(m);
                ordered.insert(m.to_string());
            }
        }

        ordered.extend(remaining.into_iter().map(str::to_string));
        ordered
    }

    /// The repair steps for a mod whose errors are all fixable: update first
    /// when outdated, then one step per broken dependency in declaration order.
    pub fn fix_chain(&self, unique_name: &str) -> Result<Vec<FixAction>, SError> {
        let unfixable = |reason: String| SError::Unfixable {
            unique_name: unique_name.to_string(),
            reason,
        };

        let m = match self.snapshot.find(unique_name) {
            Some(m) => m,
            None => {
                return match self.snapshot.get(unique_name) {
                    Some(UnsafeLocalMod::Invalid(_)) => {
                        Err(unfixable("manifest could not be read".into()))
                    }
                    _ => Err(SError::ModNotFound(unique_name.to_string())),
                }
            }
        };

        if let Some(blocking) = m.errors.iter().find(|e| !e.error_type.is_fixable()) {
            return Err(unfixable(format!("{} error present", blocking.error_type)));
        }

        let has = |error_type: ErrorType, dep: &str| {
            m.errors
                .iter()
                .any(|e| e.is(error_type) && e.payload.as_deref() == Some(dep))
        };

        let mut actions = Vec::new();
        if m.has_error(ErrorType::Outdated) {
            actions.push(FixAction::Update);
        }

        for dep in declared(&m.manifest.dependencies, &m.unique_name) {
            if has(ErrorType::DisabledDep, dep) {
                actions.push(FixAction::EnableDep(dep.to_string()));
            } else if has(ErrorType::MissingDep, dep) {
                if self.snapshot.remote(dep).is_none() {
                    return Err(unfixable(format!(
                        "dependency {} is not installed and not in the catalog",
                        dep
                    )));
                }
                actions.push(FixAction::InstallDep(dep.to_string()));
            }
        }

        Ok(actions)
    }
}
