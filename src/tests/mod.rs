use proptest::prelude::*;

use crate::{
    jvm::references::ClassRef,
    types::{
        field_type::{FieldType, PrimitiveType},
        signatures::{
            ClassType, ClassTypeSegment, GenericReturnType, MethodSignature, TypeArgument,
            TypeParameter, Wildcard,
        },
    },
};

pub(crate) fn arb_identifier() -> impl Strategy<Value = String> {
    prop::string::string_regex(r"[a-zA-Z_][a-zA-Z0-9_\$]{0,8}").expect("The regex is invalid")
}

pub(crate) fn arb_class_name() -> impl Strategy<Value = String> {
    prop::collection::vec(arb_identifier(), 1..6).prop_map(|v| v.join("/"))
}

pub(crate) fn arb_non_array_field_type() -> impl Strategy<Value = FieldType> {
    prop_oneof![
        any::<PrimitiveType>().prop_map(FieldType::Base),
        arb_class_name()
            .prop_map(ClassRef::new)
            .prop_map(FieldType::Object),
    ]
}

prop_compose! {
    fn arb_array_field_type()(
        t in arb_non_array_field_type(),
        dim in 1..=u8::MAX
    ) -> FieldType {
        FieldType::array_of(t, dim)
    }
}

pub(crate) fn arb_field_type() -> impl Strategy<Value = FieldType> {
    prop_oneof![arb_non_array_field_type(), arb_array_field_type()]
}

fn with_dimensions(type_argument: TypeArgument, dimensions: u8) -> TypeArgument {
    (0..dimensions).fold(type_argument, |it, _| {
        it.clone().into_array_type().unwrap_or(it)
    })
}

fn arb_class_type(
    type_argument: impl Strategy<Value = TypeArgument> + Clone,
) -> impl Strategy<Value = ClassType> {
    let arguments = prop::collection::vec(type_argument, 0..3);
    (
        arb_class_name(),
        arguments.clone(),
        prop::collection::vec((arb_identifier(), arguments), 0..2),
    )
        .prop_map(|(name, type_arguments, inner_classes)| {
            let outer = ClassTypeSegment {
                name,
                type_arguments,
            };
            let inner = inner_classes
                .into_iter()
                .map(|(name, type_arguments)| ClassTypeSegment {
                    name,
                    type_arguments,
                });
            ClassType {
                segments: std::iter::once(outer).chain(inner).collect(),
            }
        })
}

/// Exact class types and type variables, possibly parameterized, without array dimensions.
fn arb_non_array_reference_type() -> BoxedStrategy<TypeArgument> {
    let leaf = prop_oneof![
        arb_class_name().prop_map(|name| TypeArgument::concrete(ClassType::raw(name))),
        arb_identifier().prop_map(TypeArgument::type_variable),
    ];
    leaf.prop_recursive(3, 32, 3, |inner| {
        let bounded = (
            inner,
            prop_oneof![
                Just(Wildcard::Exact),
                Just(Wildcard::Extends),
                Just(Wildcard::Super)
            ],
        )
            .prop_map(|(it, wildcard)| it.with_wildcard(wildcard));
        let argument = prop_oneof![
            1 => Just(TypeArgument::unbounded()),
            4 => bounded,
        ]
        .boxed();
        arb_class_type(argument).prop_map(TypeArgument::concrete)
    })
    .boxed()
}

/// Exact reference types, including arrays of primitive types.
pub(crate) fn arb_reference_type() -> impl Strategy<Value = TypeArgument> {
    prop_oneof![
        (arb_non_array_reference_type(), 0..3u8)
            .prop_map(|(it, dimensions)| with_dimensions(it, dimensions)),
        (any::<PrimitiveType>(), 1..3u8).prop_map(|(it, dimensions)| {
            with_dimensions(TypeArgument::concrete(it), dimensions)
        }),
    ]
}

/// Types that may appear as method parameters or return types.
pub(crate) fn arb_type_argument() -> impl Strategy<Value = TypeArgument> {
    prop_oneof![
        any::<PrimitiveType>().prop_map(TypeArgument::concrete),
        arb_reference_type(),
    ]
}

fn arb_type_parameter() -> impl Strategy<Value = TypeParameter> {
    let bound = arb_non_array_reference_type();
    (
        arb_identifier(),
        prop::option::of(bound.clone()),
        prop::collection::vec(bound, 0..3),
    )
        .prop_filter(
            "A type parameter needs at least one bound",
            |(_, class_bound, interface_bounds)| {
                class_bound.is_some() || !interface_bounds.is_empty()
            },
        )
        .prop_map(|(name, class_bound, interface_bounds)| TypeParameter {
            name,
            class_bound,
            interface_bounds,
        })
}

prop_compose! {
    pub(crate) fn arb_method_signature()(
        type_parameters in prop::collection::vec(arb_type_parameter(), 0..3),
        parameter_types in prop::collection::vec(arb_type_argument(), 0..5),
        return_type in prop::option::of(arb_type_argument()),
        exception_types in prop::collection::vec(arb_non_array_reference_type(), 0..2),
    ) -> MethodSignature {
        MethodSignature {
            type_parameters,
            parameter_types,
            return_type: return_type.map_or(GenericReturnType::Void, GenericReturnType::Some),
            exception_types,
        }
    }
}
