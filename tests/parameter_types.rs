use jnullness::{
    analysis::{
        cache::ParameterTypeCache,
        parameter_types::{Error, ParameterTypeResolver},
    },
    jvm::{declaration::MethodDeclaration, references::ClassRef},
    types::{
        field_type::{FieldType, PrimitiveType},
        signatures::{MalformedKind, Wildcard},
    },
};

fn collection_method() -> MethodDeclaration {
    MethodDeclaration::new(
        "org/example/Lib",
        "copy",
        "(Ljava/util/Map;[Ljava/lang/Comparable;Lorg/example/Lib;I)Ljava/util/List;",
    )
    .unwrap()
    .with_signature(concat!(
        "<K:Ljava/lang/Object;V::Ljava/lang/Comparable<-TV;>;>",
        "(Ljava/util/Map<TK;+Ljava/util/List<*>;>;[TV;Lorg/example/Lib<[Ljava/lang/Object;>;I)",
        "Ljava/util/List<TV;>;",
        "^Ljava/io/IOException;"
    ))
}

#[test]
fn resolves_generic_parameters() {
    let resolver = ParameterTypeResolver::for_declaration(&collection_method()).unwrap();
    assert_eq!(resolver.parameter_count(), 4);

    let map = resolver.resolve(0).unwrap();
    assert_eq!(map.base_type, FieldType::Object(ClassRef::new("java/util/Map")));
    assert_eq!(map.type_arguments.len(), 2);
    assert_eq!(map.type_arguments[0].as_type_variable(), Some("K"));
    let values = &map.type_arguments[1];
    assert_eq!(values.wildcard(), Wildcard::Extends);
    assert_eq!(values.type_arguments()[0].wildcard(), Wildcard::Unbounded);

    let array = resolver.resolve(1).unwrap();
    assert_eq!(
        array.base_type,
        FieldType::array_of(FieldType::Object(ClassRef::new("java/lang/Comparable")), 1)
    );

    let lib = resolver.resolve(2).unwrap();
    let element = lib.type_arguments[0].clone();
    assert_eq!(element.array_dimensions(), 1);
    assert_eq!(
        element.descriptor().unwrap().component_type(),
        Some(&FieldType::object())
    );

    let int = resolver.resolve(3).unwrap();
    assert_eq!(int.base_type, FieldType::Base(PrimitiveType::Int));
    assert!(int.type_arguments.is_empty());

    assert!(matches!(
        resolver.resolve(4),
        Err(Error::IndexOutOfRange { index: 4, count: 4 })
    ));
}

#[test]
fn type_parameter_bounds() {
    let resolver = ParameterTypeResolver::for_declaration(&collection_method()).unwrap();
    let bound = resolver.resolve_type_parameter_bound(1, 0).unwrap();
    assert_eq!(
        bound.as_class_type().map(|it| it.binary_name()),
        Some("java/lang/Comparable".to_owned())
    );
    assert_eq!(bound.type_arguments()[0].wildcard(), Wildcard::Super);
    assert!(matches!(
        resolver.resolve_type_parameter_bound(1, 1),
        Err(Error::BoundOutOfRange { .. })
    ));
}

#[test]
fn malformed_signature_falls_back_to_descriptor() {
    let declaration = MethodDeclaration::new("org/example/Lib", "get", "(Ljava/util/Set;)V")
        .unwrap()
        .with_signature("(Ljava/util/Set<Ljava/lang/Object;)V");
    let error = ParameterTypeResolver::for_declaration(&declaration).unwrap_err();
    let Error::MalformedSignature(malformed) = error else {
        panic!("Unexpected error: {error}");
    };
    assert_eq!(malformed.kind, MalformedKind::UnexpectedCharacter(')'));

    let resolver = ParameterTypeResolver::for_declaration_or_erased(&declaration);
    assert!(resolver.signature().is_none());
    let parameter = resolver.resolve(0).unwrap();
    assert_eq!(
        parameter.base_type,
        FieldType::Object(ClassRef::new("java/util/Set"))
    );
    assert!(parameter.type_arguments.is_empty());
}

#[test]
fn parameter_count_mismatch() {
    let declaration = MethodDeclaration::new("org/example/Lib", "<init>", "(Ljava/lang/String;I)V")
        .unwrap()
        .with_signature("(I)V");
    assert_eq!(
        ParameterTypeResolver::for_declaration(&declaration).unwrap_err(),
        Error::ParameterCountMismatch {
            signature: 1,
            descriptor: 2
        }
    );
}

#[test]
fn cached_resolvers_are_shared() {
    let cache = ParameterTypeCache::new();
    let declaration = collection_method();
    let first = cache.resolver_of(&declaration);
    let second = cache.resolver_of(&declaration.clone());
    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);
}

#[test]
fn deeply_nested_input_is_rejected() {
    let descriptor = format!("({}I)V", "[".repeat(1_000_000));
    assert!(matches!(
        ParameterTypeResolver::from_strs(&descriptor, None),
        Err(Error::InvalidDescriptor(_))
    ));

    let signature = format!(
        "({}Ljava/lang/Object;{})V",
        "Ljava/util/List<".repeat(100_000),
        ">;".repeat(100_000)
    );
    let Err(Error::MalformedSignature(malformed)) =
        ParameterTypeResolver::from_strs("(Ljava/util/List;)V", Some(&signature))
    else {
        panic!("Nested type arguments should be rejected");
    };
    assert_eq!(malformed.kind, MalformedKind::TooDeeplyNested);
}
