//! Column name normalization.

use std::collections::HashSet;

/// Normalize one column name: lowercase, spaces and hyphens to underscores,
/// parentheses removed, surrounding whitespace trimmed.
pub(crate) fn normalize_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .filter(|c| *c != '(' && *c != ')')
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// Result of normalizing every column name of a table.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct NormalizedNames {
    /// New names in column order, guaranteed unique.
    pub names: Vec<String>,
    /// (original, new) for each column whose name changed.
    pub renamed: Vec<(String, String)>,
    pub collisions: Vec<Collision>,
}

/// Several original names that normalize to the same base name.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Collision {
    pub base: String,
    pub sources: Vec<String>,
    /// The unique names the sources ended up with, in column order.
    pub resolved: Vec<String>,
}

/// Normalize all names, suffixing `_2`, `_3`, ... onto later names that collide.
pub(crate) fn normalize_names<S: AsRef<str>>(original: &[S]) -> NormalizedNames {
    let bases: Vec<String> = original.iter().map(|n| normalize_name(n.as_ref())).collect();

    let mut taken: HashSet<String> = HashSet::new();
    let mut result = NormalizedNames::default();

    for (idx, base) in bases.iter().enumerate() {
        let mut name = base.clone();
        if taken.contains(&name) {
            let mut suffix = 2;
            // A suffixed name must not take the base name of a later column.
            loop {
                name = format!("{base}_{suffix}");
                if !taken.contains(&name) && !bases.contains(&name) {
                    break;
                }
                suffix += 1;
            }
        }
        taken.insert(name.clone());

        let source = original[idx].as_ref();
        if source != name {
            result.renamed.push((source.to_string(), name.clone()));
        }
        result.names.push(name);
    }

    for (idx, base) in bases.iter().enumerate() {
        let first = bases.iter().position(|b| b == base) == Some(idx);
        let members: Vec<usize> = (0..bases.len()).filter(|&i| bases[i] == *base).collect();
        if !first || members.len() < 2 {
            continue;
        }
        result.collisions.push(Collision {
            base: base.clone(),
            sources: members.iter().map(|&i| original[i].as_ref().to_string()).collect(),
            resolved: members.iter().map(|&i| result.names[i].clone()).collect(),
        });
    }

    result
}
