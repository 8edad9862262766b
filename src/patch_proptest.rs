//! Property-based tests for recipe rewriting.
//!
//! These tests generate recipes citing one internal repository and verify
//! that after patching no trace of the old coordinates is left while every
//! new coordinate is present.

#[cfg(test)]
mod proptest_tests {
    use std::path::PathBuf;

    use crate::patch::recipe::RecipePatch;
    use crate::reference::{Provenance, ProvenanceKind, PublishedReference, RepositoryReference};
    use crate::test_support::test_config;
    use proptest::prelude::*;

    fn recipe_strategy() -> impl Strategy<Value = (String, String, String, String, bool, Vec<String>)>
    {
        (
            "lib[g-z]{2,6}\\.git",
            "[a-f]{8,12}",
            "release/[0-9]\\.[0-9]{1,2}",
            prop_oneof![Just("="), Just("?="), Just(":="), Just("??=")].prop_map(String::from),
            any::<bool>(),
            prop::collection::vec("[G-Z_]{1,8} = \"[g-z ]{0,10}\"", 0..4),
        )
    }

    fn render(
        name: &str,
        revision: &str,
        branch: &str,
        operator: &str,
        literal_branch_param: bool,
        filler: &[String],
    ) -> String {
        let branch_param = if literal_branch_param {
            branch.to_string()
        } else {
            "${SRCBRANCH}".to_string()
        };
        let mut lines: Vec<String> = filler.to_vec();
        lines.push(format!(
            "SRC_URI = \"git://internal.host/base/{};branch={};protocol=ssh\"",
            name, branch_param
        ));
        lines.push(format!("SRCBRANCH {} \"{}\"", operator, branch));
        lines.push(format!("SRCREV {} \"{}\"", operator, revision));
        lines.extend(filler.iter().rev().cloned());
        let mut content = lines.join("\n");
        content.push('\n');
        content
    }

    fn references(
        name: &str,
        revision: &str,
        branch: &str,
        new_revision: &str,
        new_branch: &str,
    ) -> (RepositoryReference, PublishedReference) {
        let old = RepositoryReference {
            url: "git://internal.host/base".to_string(),
            name: name.to_string(),
            branch: Some(branch.to_string()),
            revision: revision.to_string(),
            path: None,
            provenance: Provenance::new(ProvenanceKind::Recipe, PathBuf::from("recipe.bb")),
        };
        let new = PublishedReference {
            name: name.to_string(),
            url: "git://github.com/Org".to_string(),
            revision: new_revision.to_string(),
            branch: new_branch.to_string(),
        };
        (old, new)
    }

    proptest! {
        /// Property: no old coordinate survives a patch, every new one is present
        #[test]
        fn patch_replaces_every_old_coordinate(
            (name, revision, branch, operator, literal, filler) in recipe_strategy(),
            new_revision in "[0-9]{40}",
            new_branch in "github_publication_[A-Z]{2}",
        ) {
            let content = render(&name, &revision, &branch, &operator, literal, &filler);
            let (old, new) = references(&name, &revision, &branch, &new_revision, &new_branch);
            let config = test_config(&std::env::temp_dir());
            let patched = RecipePatch::new(&config, &old, &new).unwrap().patch_text(&content);

            prop_assert!(!patched.contains(&old.full_url()), "old URL left in:\n{}", patched);
            prop_assert!(!patched.contains(&revision), "old revision left in:\n{}", patched);
            prop_assert!(!patched.contains(&branch), "old branch left in:\n{}", patched);
            prop_assert!(!patched.contains(";protocol=ssh"));
            prop_assert!(patched.contains(&new.full_url()));
            prop_assert!(patched.contains(&new_revision));
            prop_assert!(
                patched.contains(&format!("SRCBRANCH = \"{}\"", new_branch)),
                "new branch missing in:\n{}",
                patched
            );
        }

        /// Property: a revision that is part of the branch name does not
        /// stop the branch from being rewritten
        #[test]
        fn patch_rewrites_branch_containing_revision(
            version in "[0-9]\\.[0-9]{1,2}",
            trailing_slash in any::<bool>(),
            new_revision in "[a-f]{40}",
        ) {
            let branch = format!("release/{}", version);
            let slash = if trailing_slash { "/" } else { "" };
            let content = format!(
                "SRC_URI = \"git://internal.host/base/libfoo.git{};branch={};protocol=ssh\"\nSRCBRANCH = \"{}\"\nSRCREV = \"{}\"\n",
                slash, branch, branch, version
            );
            let (old, new) =
                references("libfoo.git", &version, &branch, &new_revision, "github_publication_X");
            let config = test_config(&std::env::temp_dir());
            let patched = RecipePatch::new(&config, &old, &new).unwrap().patch_text(&content);

            prop_assert_eq!(
                patched,
                format!(
                    "SRC_URI = \"git://github.com/Org/libfoo.git;branch=github_publication_X\"\nSRCBRANCH = \"github_publication_X\"\nSRCREV = \"{}\"\n",
                    new_revision
                )
            );
        }

        /// Property: patching is idempotent
        #[test]
        fn patch_is_idempotent(
            (name, revision, branch, operator, literal, filler) in recipe_strategy(),
            new_revision in "[0-9]{40}",
        ) {
            let content = render(&name, &revision, &branch, &operator, literal, &filler);
            let (old, new) =
                references(&name, &revision, &branch, &new_revision, "github_publication_X");
            let config = test_config(&std::env::temp_dir());
            let patch = RecipePatch::new(&config, &old, &new).unwrap();
            let once = patch.patch_text(&content);
            prop_assert_eq!(patch.patch_text(&once), once);
        }

        /// Property: text without the old coordinates is left unchanged
        #[test]
        fn patch_leaves_unrelated_text_alone(
            filler in prop::collection::vec("[G-Z_]{1,8} = \"[g-z ]{0,10}\"", 0..8),
        ) {
            let content = filler.join("\n");
            let (old, new) = references(
                "libbar.git",
                "deadbeef",
                "release/1.0",
                "0123456789",
                "github_publication_X",
            );
            let config = test_config(&std::env::temp_dir());
            let patch = RecipePatch::new(&config, &old, &new).unwrap();
            prop_assert_eq!(patch.patch_text(&content), content);
        }
    }
}
