use crate::compiler_frontend::types::IType;

/// Cost given to wildcards when ranking competing matches, effectively "least specific".
pub const WILDCARD_SPECIFICITY_COST: usize = 1000;

/// Whether a nullable candidate may stand in for a non-null requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullPolicy {
    #[default]
    Strict,
    AllowNullWidening,
}

/// Can a value of `candidate` type be plugged into a socket that requires `required`?
///
/// The relation is asymmetric. Uses `NullPolicy::Strict`.
pub fn check_type_compatibility(required: &IType, candidate: &IType) -> bool {
    check_type_compatibility_with(required, candidate, NullPolicy::Strict)
}

pub fn check_type_compatibility_with(
    required: &IType,
    candidate: &IType,
    policy: NullPolicy,
) -> bool {
    if required == candidate {
        return true;
    }

    if required.is_wildcard() {
        return true;
    }

    // Every member of a union candidate must fit, checked before the required side is
    // unpacked so union-vs-union compares member by member
    if let IType::Union(members) = candidate {
        return members
            .iter()
            .all(|member| check_type_compatibility_with(required, member, policy));
    }

    match (required, candidate) {
        (IType::Union(members), _) => members
            .iter()
            .any(|member| check_type_compatibility_with(member, candidate, policy)),

        // Required nullable, candidate nullable
        (IType::Nullable(required_inner), IType::Nullable(candidate_inner)) => {
            check_type_compatibility_with(required_inner, candidate_inner, policy)
        }

        // Required nullable, candidate non-null
        (IType::Nullable(required_inner), _) => {
            candidate == &IType::Null
                || check_type_compatibility_with(required_inner, candidate, policy)
        }

        // Candidate nullable, required non-null
        (_, IType::Nullable(candidate_inner)) => match policy {
            NullPolicy::Strict => false,
            NullPolicy::AllowNullWidening => {
                check_type_compatibility_with(required, candidate_inner, policy)
            }
        },

        (IType::List(required_inner), IType::List(candidate_inner))
        | (IType::Event(required_inner), IType::Event(candidate_inner))
        | (IType::Interval(required_inner), IType::Interval(candidate_inner))
        | (IType::Timeline(required_inner), IType::Timeline(candidate_inner)) => {
            check_type_compatibility_with(required_inner, candidate_inner, policy)
        }

        (IType::Struct(required_fields), IType::Struct(candidate_fields)) => {
            required_fields.len() == candidate_fields.len()
                && required_fields.iter().all(|(name, required_field)| {
                    candidate_fields.get(name).is_some_and(|candidate_field| {
                        check_type_compatibility_with(required_field, candidate_field, policy)
                    })
                })
        }

        _ => false,
    }
}

/// Lower is more specific. Used to break ties between primitive transformers.
pub fn specificity_cost(ty: &IType) -> usize {
    match ty {
        IType::Union(members) => members.len(),
        IType::Wildcard => WILDCARD_SPECIFICITY_COST,
        _ => 1,
    }
}
