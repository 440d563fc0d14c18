use crate::compiler_frontend::types::{IType, check_type_compatibility};
use std::collections::BTreeMap;

/// Works out what the wildcard in `shape` must be for `concrete` to fit it.
///
/// `list<*>` against `list<number>` infers `number`. Every wildcard occurrence must bind
/// to the same type. A shape without wildcards infers `concrete` itself when compatible.
/// `None` means no consistent substitution exists, and callers treat it as incompatible.
pub fn infer_abstract_type(shape: &IType, concrete: &IType) -> Option<IType> {
    if !shape.contains_wildcard() {
        return check_type_compatibility(shape, concrete).then(|| concrete.clone());
    }

    let mut binding = None;
    if !unify(shape, concrete, &mut binding) {
        return None;
    }

    // Matched without touching the wildcard (e.g. `nullable<*>` against `null`)
    Some(binding.unwrap_or(IType::Wildcard))
}

/// Substitutes every wildcard in `shape` with `inferred`.
pub fn replace_abstract_type(shape: &IType, inferred: &IType) -> IType {
    match shape {
        IType::Wildcard => inferred.clone(),
        IType::Nullable(inner) => IType::nullable(replace_abstract_type(inner, inferred)),
        IType::List(inner) => IType::list(replace_abstract_type(inner, inferred)),
        IType::Event(inner) => IType::event(replace_abstract_type(inner, inferred)),
        IType::Interval(inner) => IType::interval(replace_abstract_type(inner, inferred)),
        IType::Timeline(inner) => IType::timeline(replace_abstract_type(inner, inferred)),
        IType::Union(members) => IType::Union(
            members
                .iter()
                .map(|member| replace_abstract_type(member, inferred))
                .collect(),
        ),
        IType::Struct(fields) => IType::Struct(
            fields
                .iter()
                .map(|(name, field)| (name.clone(), replace_abstract_type(field, inferred)))
                .collect(),
        ),
        concrete => concrete.clone(),
    }
}

fn unify(shape: &IType, concrete: &IType, binding: &mut Option<IType>) -> bool {
    if !shape.contains_wildcard() {
        return check_type_compatibility(shape, concrete);
    }

    match (shape, concrete) {
        (IType::Wildcard, _) => match binding {
            Some(bound) => bound == concrete,
            None => {
                *binding = Some(concrete.clone());
                true
            }
        },

        (IType::Nullable(shape_inner), IType::Nullable(concrete_inner)) => {
            unify(shape_inner, concrete_inner, binding)
        }
        (IType::Nullable(_), IType::Null) => true,
        (IType::Nullable(shape_inner), _) => unify(shape_inner, concrete, binding),

        (IType::List(shape_inner), IType::List(concrete_inner))
        | (IType::Event(shape_inner), IType::Event(concrete_inner))
        | (IType::Interval(shape_inner), IType::Interval(concrete_inner))
        | (IType::Timeline(shape_inner), IType::Timeline(concrete_inner)) => {
            unify(shape_inner, concrete_inner, binding)
        }

        (IType::Struct(shape_fields), IType::Struct(concrete_fields)) => {
            shape_fields.len() == concrete_fields.len()
                && shape_fields.iter().all(|(name, shape_field)| {
                    concrete_fields
                        .get(name)
                        .is_some_and(|concrete_field| unify(shape_field, concrete_field, binding))
                })
        }

        (IType::Union(shape_members), IType::Union(concrete_members))
            if shape_members.len() == concrete_members.len() =>
        {
            shape_members
                .iter()
                .zip(concrete_members)
                .all(|(shape_member, concrete_member)| {
                    unify(shape_member, concrete_member, binding)
                })
        }

        // The concrete type has to land on one member of the shape union
        (IType::Union(shape_members), _) => {
            for member in shape_members {
                let mut attempt = binding.clone();
                if unify(member, concrete, &mut attempt) {
                    *binding = attempt;
                    return true;
                }
            }
            false
        }

        _ => false,
    }
}

/// A group of sibling sockets on one block that share a wildcard-bearing shape.
///
/// Plugging a concrete type into one socket pushes the inferred substitution into all of
/// them, so `a: list<*>` and `b: *` become `list<number>` and `number` together.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedSockets {
    shapes: BTreeMap<String, IType>,
    current: BTreeMap<String, IType>,
}

impl TypedSockets {
    pub fn new<K: Into<String>>(shapes: impl IntoIterator<Item = (K, IType)>) -> Self {
        let shapes = shapes
            .into_iter()
            .map(|(name, shape)| (name.into(), shape))
            .collect::<BTreeMap<_, _>>();

        TypedSockets {
            current: shapes.clone(),
            shapes,
        }
    }

    pub fn socket_type(&self, socket: &str) -> Option<&IType> {
        self.current.get(socket)
    }

    /// Returns false (and changes nothing) if `concrete` cannot fit the socket's shape.
    pub fn set_type(&mut self, socket: &str, concrete: &IType) -> bool {
        let Some(shape) = self.shapes.get(socket) else {
            return false;
        };

        let Some(inferred) = infer_abstract_type(shape, concrete) else {
            return false;
        };

        for (name, shape) in &self.shapes {
            self.current
                .insert(name.clone(), replace_abstract_type(shape, &inferred));
        }

        true
    }

    pub fn reset_types(&mut self) {
        self.current = self.shapes.clone();
    }
}
