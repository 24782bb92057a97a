use crate::{
    error::{Error, HttpError},
    schema::{Attribute, Id, Recipe, User},
};

/// Records that belong to exactly one user.
pub trait Owned {
    fn owner_id(&self) -> Id;

    fn is_owned_by(&self, user_id: Id) -> bool {
        self.owner_id() == user_id
    }
}

impl Owned for Recipe {
    fn owner_id(&self) -> Id {
        self.user_id
    }
}

impl Owned for Attribute {
    fn owner_id(&self) -> Id {
        self.user_id
    }
}

/// Someone else's record answers exactly like a missing one.
pub fn ensure_owner<T: Owned>(user: &User, resource: Option<T>) -> Result<T, Error> {
    match resource {
        Some(resource) if resource.is_owned_by(user.id) => Ok(resource),
        _ => Err(HttpError::NotFound.default()),
    }
}
