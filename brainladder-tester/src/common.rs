use anyhow::{Context, Result, bail};
use brainladder_game::{Catalog, LevelId};

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Resolve `--levels`: `all`, single ids and inclusive ranges like `3-7`.
pub fn resolve_levels(arg: &str, catalog: &Catalog) -> Result<Vec<LevelId>> {
    let mut levels = Vec::new();
    for token in split_csv(arg) {
        if token.eq_ignore_ascii_case("all") {
            levels.extend(catalog.levels().map(|level| level.id));
        } else if let Some((start, end)) = token.split_once('-') {
            let start: LevelId = start
                .trim()
                .parse()
                .with_context(|| format!("invalid level range '{token}'"))?;
            let end: LevelId = end
                .trim()
                .parse()
                .with_context(|| format!("invalid level range '{token}'"))?;
            if start > end {
                bail!("level range '{token}' runs backwards");
            }
            levels.extend(start..=end);
        } else {
            levels.push(
                token
                    .parse()
                    .with_context(|| format!("invalid level id '{token}'"))?,
            );
        }
    }
    levels.sort_unstable();
    levels.dedup();
    Ok(levels)
}

pub fn resolve_seeds(arg: &str) -> Result<Vec<u64>> {
    split_csv(arg)
        .iter()
        .map(|token| {
            token
                .parse()
                .with_context(|| format!("invalid seed '{token}'"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use brainladder_game::{EngineConfig, MechanicRegistry};

    fn catalog() -> Catalog {
        Catalog::embedded(&MechanicRegistry::standard(), &EngineConfig::default()).unwrap()
    }

    #[test]
    fn split_csv_trims_and_filters() {
        let parts = split_csv(" alpha, ,beta,  gamma ");
        assert_eq!(parts, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn levels_accept_ranges_and_dedupe() {
        let levels = resolve_levels("5, 1-3, 2", &catalog()).unwrap();
        assert_eq!(levels, vec![1, 2, 3, 5]);
    }

    #[test]
    fn all_expands_to_the_catalog() {
        let levels = resolve_levels("all", &catalog()).unwrap();
        assert_eq!(levels.len(), 30);
        assert_eq!(levels.first(), Some(&1));
    }

    #[test]
    fn bad_tokens_are_rejected() {
        assert!(resolve_levels("7-3", &catalog()).is_err());
        assert!(resolve_levels("one", &catalog()).is_err());
        assert!(resolve_seeds("1, x").is_err());
        assert_eq!(resolve_seeds("1, 2").unwrap(), vec![1, 2]);
    }
}
