//! Read/write/create rules for sets. Callers pass the viewer explicitly;
//! there is no ambient session.

use crate::models::{Set, Visibility};

/// Authenticated identity making a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: String,
}

impl Viewer {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

pub fn is_owner(viewer: &Viewer, set: &Set) -> bool {
    viewer.user_id == set.user_id
}

/// Non-private sets are readable by anyone; private sets only by their owner.
pub fn can_read(viewer: Option<&Viewer>, set: &Set) -> bool {
    set.visibility != Visibility::Private || viewer.is_some_and(|v| is_owner(v, set))
}

pub fn can_write(viewer: &Viewer, set: &Set) -> bool {
    is_owner(viewer, set)
}

pub fn can_create(viewer: Option<&Viewer>) -> bool {
    viewer.is_some()
}

/// Only public sets show up in browse and search.
pub fn is_listed(set: &Set) -> bool {
    set.visibility == Visibility::Public
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CardDraft, SetDraft};

    fn set_with(visibility: Visibility) -> Set {
        Set::from_draft(
            "owner",
            SetDraft {
                name: "Kanji".to_string(),
                description: "N5".to_string(),
                category: None,
                visibility,
                cards: vec![CardDraft {
                    front: "水".to_string(),
                    back: "water".to_string(),
                }],
            },
        )
    }

    #[test]
    fn test_private_set_readable_only_by_owner() {
        let set = set_with(Visibility::Private);
        assert!(can_read(Some(&Viewer::new("owner")), &set));
        assert!(!can_read(Some(&Viewer::new("stranger")), &set));
        assert!(!can_read(None, &set));
    }

    #[test]
    fn test_non_private_sets_readable_by_anyone() {
        for visibility in [Visibility::Public, Visibility::Unlisted] {
            let set = set_with(visibility);
            assert!(can_read(None, &set));
            assert!(can_read(Some(&Viewer::new("stranger")), &set));
        }
    }

    #[test]
    fn test_write_is_owner_only() {
        let set = set_with(Visibility::Public);
        assert!(can_write(&Viewer::new("owner"), &set));
        assert!(!can_write(&Viewer::new("stranger"), &set));
    }

    #[test]
    fn test_create_requires_viewer() {
        assert!(can_create(Some(&Viewer::new("anyone"))));
        assert!(!can_create(None));
    }

    #[test]
    fn test_only_public_is_listed() {
        assert!(is_listed(&set_with(Visibility::Public)));
        assert!(!is_listed(&set_with(Visibility::Unlisted)));
        assert!(!is_listed(&set_with(Visibility::Private)));
    }
}
