//! Class catalog: the remote class list with each name's suffix decoded.

use serde::Serialize;

use roster_api::{RemoteClass, SchoolApi};
use roster_core::grammar::split_class_name;
use roster_core::text::normalize_course;
use roster_core::{ClassDescriptor, ClassId};

use crate::error::SyncError;

/// A remote class excluded from matching because its name has no
/// recognizable `<grade><level><section>` suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IgnoredClass {
    pub id: ClassId,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Catalog {
    pub classes: Vec<ClassDescriptor>,
    pub ignored: Vec<IgnoredClass>,
}

impl Catalog {
    /// Decode every remote class, in listing order.
    pub fn resolve(remote: Vec<RemoteClass>) -> Self {
        let mut catalog = Catalog::default();
        for class in remote {
            let id = ClassId(class.ge_clase_id);
            let name = class.name().unwrap_or_default().to_string();
            match split_class_name(&name) {
                Some((base_name, suffix)) => catalog.classes.push(ClassDescriptor {
                    id,
                    base_norm: normalize_course(&base_name),
                    base_name,
                    display_name: name,
                    level: suffix.level,
                    grade: suffix.grade,
                    section: suffix.section,
                }),
                None => catalog.ignored.push(IgnoredClass { id, name }),
            }
        }
        catalog
    }

    /// Fetch the class list once and resolve it. Failure is fatal for a run.
    pub fn fetch<A: SchoolApi + ?Sized>(api: &A) -> Result<Self, SyncError> {
        let remote = api.list_classes().map_err(SyncError::Catalog)?;
        tracing::debug!("catalog: {} remote classes", remote.len());
        Ok(Self::resolve(remote))
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
