use serde::{
  Deserialize,
  Deserializer,
  Serialize
};

/// Envelope returned by `GET
/// /products`. Only `data` is consumed.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  Default,
)]
pub struct ApiResponse {
  #[serde(
    default,
    deserialize_with = "null_as_default"
  )]
  pub code:   i64,
  #[serde(
    default,
    deserialize_with = "null_as_default"
  )]
  pub data:   Vec<TaskWire>,
  #[serde(
    default,
    deserialize_with = "null_as_default"
  )]
  pub remark: String
}

/// The store sends `null` for fields it
/// never filled; read those as empty.
fn null_as_default<'de, D, T>(
  deserializer: D
) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de> + Default
{
  Ok(
    Option::<T>::deserialize(
      deserializer
    )?
    .unwrap_or_default()
  )
}

/// A task record as the remote store
/// sends it. The store is inconsistent
/// about `id` vs `_id`; use
/// [`TaskWire::identity`] instead of
/// reading either field directly.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Default,
)]
pub struct TaskWire {
  #[serde(
    rename = "_id",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub store_id: Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub id:       Option<String>,
  #[serde(
    default,
    deserialize_with = "null_as_default"
  )]
  pub date:     String,
  #[serde(
    default,
    deserialize_with = "null_as_default"
  )]
  pub time:     String,
  #[serde(
    default,
    deserialize_with = "null_as_default"
  )]
  pub entity:   String,
  #[serde(
    default,
    deserialize_with = "null_as_default"
  )]
  pub task:     String,
  #[serde(
    default,
    deserialize_with = "null_as_default"
  )]
  pub person:   String,
  #[serde(
    default,
    deserialize_with = "null_as_default"
  )]
  pub notes:    String,
  #[serde(
    default,
    deserialize_with = "null_as_default"
  )]
  pub status:   String
}

impl TaskWire {
  /// `_id` wins over `id`; blank
  /// values count as absent.
  pub fn identity(
    &self
  ) -> Option<&str> {
    self
      .store_id
      .as_deref()
      .or(self.id.as_deref())
      .map(str::trim)
      .filter(|id| !id.is_empty())
  }
}

/// Body of `POST /products`. Carries
/// no identity; the store assigns one.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Default,
)]
pub struct TaskCreate {
  pub date:   String,
  pub time:   String,
  pub entity: String,
  pub task:   String,
  pub person: String,
  pub notes:  String,
  pub status: String
}

/// Body of `PUT /products/{id}`.
/// Absent fields are left alone by the
/// store and are not serialized.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Default,
)]
pub struct TaskPatch {
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub date:   Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub time:   Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub entity: Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub task:   Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub person: Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub notes:  Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub status: Option<String>
}

impl TaskPatch {
  pub fn status(
    status: impl Into<String>
  ) -> Self {
    Self {
      status: Some(status.into()),
      ..Self::default()
    }
  }

  pub fn notes(
    notes: impl Into<String>
  ) -> Self {
    Self {
      notes: Some(notes.into()),
      ..Self::default()
    }
  }

  /// A patch overwriting every
  /// persisted field.
  pub fn full(create: TaskCreate) -> Self {
    Self {
      date:   Some(create.date),
      time:   Some(create.time),
      entity: Some(create.entity),
      task:   Some(create.task),
      person: Some(create.person),
      notes:  Some(create.notes),
      status: Some(create.status)
    }
  }

  /// Applies the present fields onto a
  /// wire record.
  pub fn apply_to(
    &self,
    wire: &mut TaskWire
  ) {
    let fields = [
      (&self.date, &mut wire.date),
      (&self.time, &mut wire.time),
      (&self.entity, &mut wire.entity),
      (&self.task, &mut wire.task),
      (&self.person, &mut wire.person),
      (&self.notes, &mut wire.notes),
      (&self.status, &mut wire.status)
    ];
    for (patch, target) in fields {
      if let Some(value) = patch {
        *target = value.clone();
      }
    }
  }
}
