use std::str::FromStr;

use crate::types::field_type::PrimitiveType;

use super::{
    ClassSignature, ClassType, ClassTypeSegment, FieldSignature, GenericReturnType,
    MalformedKind, MalformedSignature, MethodSignature, TypeArgument, TypeParameter, Wildcard,
};

/// A recursive-descent reader over the text of a signature.
struct SignatureReader<'s> {
    signature: &'s str,
    remaining: &'s str,
    /// The number of enclosing type argument lists.
    depth: usize,
}

/// The deepest nesting of type argument lists accepted by the parser.
/// Recursion follows the nesting, so the limit bounds the stack usage.
pub(crate) const MAX_NESTING_DEPTH: usize = 64;

type ParseResult<T> = Result<T, MalformedSignature>;

/// Characters that terminate an identifier in a signature.
const fn is_identifier_terminator(c: char) -> bool {
    matches!(c, '.' | ';' | '[' | '/' | '<' | '>' | ':')
}

impl<'s> SignatureReader<'s> {
    fn new(signature: &'s str) -> Self {
        Self {
            signature,
            remaining: signature,
            depth: 0,
        }
    }

    fn position(&self) -> usize {
        self.signature.len() - self.remaining.len()
    }

    fn error(&self, kind: MalformedKind) -> MalformedSignature {
        MalformedSignature {
            signature: self.signature.to_owned(),
            position: self.position(),
            kind,
        }
    }

    fn peek(&self) -> Option<char> {
        self.remaining.chars().next()
    }

    fn next(&mut self) -> ParseResult<char> {
        let mut chars = self.remaining.chars();
        let c = chars
            .next()
            .ok_or_else(|| self.error(MalformedKind::PrematureEnd))?;
        self.remaining = chars.as_str();
        Ok(c)
    }

    fn skip(&mut self, expected: char) -> bool {
        if let Some(rest) = self.remaining.strip_prefix(expected) {
            self.remaining = rest;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> ParseResult<()> {
        match self.peek() {
            Some(c) if c == expected => {
                self.remaining = &self.remaining[c.len_utf8()..];
                Ok(())
            }
            Some(c) => Err(self.error(MalformedKind::UnexpectedCharacter(c))),
            None => Err(self.error(MalformedKind::PrematureEnd)),
        }
    }

    fn unexpected_next(&self) -> MalformedSignature {
        match self.peek() {
            Some(c) => self.error(MalformedKind::UnexpectedCharacter(c)),
            None => self.error(MalformedKind::PrematureEnd),
        }
    }

    fn finish(&self) -> ParseResult<()> {
        if self.remaining.is_empty() {
            Ok(())
        } else {
            Err(self.error(MalformedKind::TrailingData))
        }
    }

    fn identifier(&mut self) -> ParseResult<&'s str> {
        let end = self
            .remaining
            .find(is_identifier_terminator)
            .unwrap_or(self.remaining.len());
        if end == 0 {
            return Err(self.unexpected_next());
        }
        let (identifier, rest) = self.remaining.split_at(end);
        self.remaining = rest;
        Ok(identifier)
    }

    /// Reads the path of the outermost class, e.g., `java/util/Map`.
    fn class_path(&mut self) -> ParseResult<String> {
        let mut path = self.identifier()?.to_owned();
        while self.skip('/') {
            path.push('/');
            path.push_str(self.identifier()?);
        }
        Ok(path)
    }

    /// Reads the leading `[`s of an array type in a loop, so that the dimensions do not
    /// consume stack.
    fn array_dimensions(&mut self) -> ParseResult<u8> {
        let mut dimensions: u8 = 0;
        while self.peek() == Some('[') {
            dimensions = dimensions
                .checked_add(1)
                .ok_or_else(|| self.error(MalformedKind::TooManyDimensions))?;
            self.next()?;
        }
        Ok(dimensions)
    }

    fn type_signature(&mut self) -> ParseResult<TypeArgument> {
        let dimensions = self.array_dimensions()?;
        let element = match self.peek() {
            Some('L' | 'T') => self.reference_type_signature()?,
            Some(c) => match PrimitiveType::try_from(c) {
                Ok(primitive_type) => {
                    self.next()?;
                    TypeArgument::concrete(primitive_type)
                }
                Err(_) => return Err(self.error(MalformedKind::UnexpectedCharacter(c))),
            },
            None => return Err(self.error(MalformedKind::PrematureEnd)),
        };
        (0..dimensions).try_fold(element, |it, _| {
            it.into_array_type()
                .ok_or_else(|| self.error(MalformedKind::TooManyDimensions))
        })
    }

    fn reference_type_signature(&mut self) -> ParseResult<TypeArgument> {
        match self.peek() {
            Some('L') => self.class_type_signature().map(TypeArgument::concrete),
            Some('T') => {
                self.next()?;
                let name = self.identifier()?;
                self.expect(';')?;
                Ok(TypeArgument::type_variable(name))
            }
            Some('[') => self.type_signature(),
            _ => Err(self.unexpected_next()),
        }
    }

    fn class_type_signature(&mut self) -> ParseResult<ClassType> {
        self.expect('L')?;
        let mut segments = vec![ClassTypeSegment {
            name: self.class_path()?,
            type_arguments: self.type_arguments()?,
        }];
        while self.skip('.') {
            segments.push(ClassTypeSegment {
                name: self.identifier()?.to_owned(),
                type_arguments: self.type_arguments()?,
            });
        }
        self.expect(';')?;
        Ok(ClassType { segments })
    }

    /// Reads an optional type argument list, e.g., `<TT;+Ljava/lang/Number;*>`.
    fn type_arguments(&mut self) -> ParseResult<Vec<TypeArgument>> {
        if self.peek() != Some('<') {
            return Ok(Vec::new());
        }
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error(MalformedKind::TooDeeplyNested));
        }
        self.next()?;
        self.depth += 1;
        let mut type_arguments = Vec::new();
        let result = loop {
            match self.type_argument() {
                Ok(it) => type_arguments.push(it),
                Err(error) => break Err(error),
            }
            if self.skip('>') {
                break Ok(type_arguments);
            }
        };
        self.depth -= 1;
        result
    }

    fn type_argument(&mut self) -> ParseResult<TypeArgument> {
        let wildcard = match self.peek() {
            Some('*') => {
                self.next()?;
                return Ok(TypeArgument::unbounded());
            }
            Some('+') => {
                self.next()?;
                Wildcard::Extends
            }
            Some('-') => {
                self.next()?;
                Wildcard::Super
            }
            _ => Wildcard::Exact,
        };
        self.reference_type_signature()
            .map(|it| it.with_wildcard(wildcard))
    }

    /// Reads an optional formal type parameter list, e.g., `<T:Ljava/lang/Object;U::TT;>`.
    fn type_parameters(&mut self) -> ParseResult<Vec<TypeParameter>> {
        if !self.skip('<') {
            return Ok(Vec::new());
        }
        let mut type_parameters = Vec::new();
        loop {
            let name = self.identifier()?.to_owned();
            self.expect(':')?;
            let class_bound = match self.peek() {
                Some(':') | None => None,
                Some(_) => Some(self.reference_type_signature()?),
            };
            let mut interface_bounds = Vec::new();
            while self.skip(':') {
                interface_bounds.push(self.reference_type_signature()?);
            }
            type_parameters.push(TypeParameter {
                name,
                class_bound,
                interface_bounds,
            });
            if self.skip('>') {
                break Ok(type_parameters);
            }
        }
    }

    fn return_type(&mut self) -> ParseResult<GenericReturnType> {
        if self.skip('V') {
            Ok(GenericReturnType::Void)
        } else {
            self.type_signature().map(GenericReturnType::Some)
        }
    }

    fn method_signature(&mut self) -> ParseResult<MethodSignature> {
        let type_parameters = self.type_parameters()?;
        self.expect('(')?;
        let mut parameter_types = Vec::new();
        while !self.skip(')') {
            parameter_types.push(self.type_signature()?);
        }
        let return_type = self.return_type()?;
        let mut exception_types = Vec::new();
        while self.skip('^') {
            exception_types.push(self.reference_type_signature()?);
        }
        self.finish()?;
        Ok(MethodSignature {
            type_parameters,
            parameter_types,
            return_type,
            exception_types,
        })
    }

    fn class_signature(&mut self) -> ParseResult<ClassSignature> {
        let type_parameters = self.type_parameters()?;
        let super_class = self.class_type_signature()?;
        let mut interfaces = Vec::new();
        while self.peek().is_some() {
            interfaces.push(self.class_type_signature()?);
        }
        Ok(ClassSignature {
            type_parameters,
            super_class,
            interfaces,
        })
    }
}

impl FromStr for MethodSignature {
    type Err = MalformedSignature;

    fn from_str(signature: &str) -> Result<Self, Self::Err> {
        tracing::debug!(signature, "parsing method signature");
        SignatureReader::new(signature).method_signature()
    }
}

impl FromStr for FieldSignature {
    type Err = MalformedSignature;

    fn from_str(signature: &str) -> Result<Self, Self::Err> {
        tracing::debug!(signature, "parsing field signature");
        let mut reader = SignatureReader::new(signature);
        let field_type = reader.reference_type_signature()?;
        reader.finish()?;
        Ok(Self { field_type })
    }
}

impl FromStr for ClassSignature {
    type Err = MalformedSignature;

    fn from_str(signature: &str) -> Result<Self, Self::Err> {
        tracing::debug!(signature, "parsing class signature");
        SignatureReader::new(signature).class_signature()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        jvm::references::ClassRef,
        tests::arb_method_signature,
        types::{
            field_type::FieldType,
            signatures::{ElementType, GenericReturnType},
        },
    };
    use proptest::prelude::*;

    fn object() -> FieldType {
        FieldType::object()
    }

    fn parse(signature: &str) -> MethodSignature {
        signature.parse().expect("Failed to parse signature")
    }

    mod return_type {
        use super::*;

        #[test]
        fn void_method() {
            assert_eq!(parse("()V").return_type, GenericReturnType::Void);
        }

        #[test]
        fn primitive_method() {
            assert_eq!(
                parse("()I").return_type,
                GenericReturnType::Some(TypeArgument::concrete(PrimitiveType::Int))
            );
        }

        #[test]
        fn generic_method() {
            let signature = parse("<T:Ljava/lang/Object;>()TT;");
            assert_eq!(
                signature.return_type,
                GenericReturnType::Some(TypeArgument::type_variable("T"))
            );
            assert_eq!(signature.type_parameter_names().collect::<Vec<_>>(), ["T"]);
        }
    }

    mod parameter_types {
        use super::*;

        #[test]
        fn no_type_arguments() {
            let signature = parse("(Ljava/lang/Object;)V");
            assert!(signature.parameter_types[0].type_arguments().is_empty());
        }

        #[test]
        fn single_type_argument() {
            let signature = parse("(Ljava/util/Set<Ljava/lang/Object;>;)V");
            let type_argument = &signature.parameter_types[0].type_arguments()[0];
            assert_eq!(type_argument.descriptor(), Some(object()));
            assert_eq!(type_argument.wildcard(), Wildcard::Exact);
        }

        #[test]
        fn two_type_variables() {
            let signature = parse("(Ljava/util/Set<TT;+TT;>;)V");
            let type_arguments = signature.parameter_types[0].type_arguments();
            assert_eq!(type_arguments.len(), 2);
            assert_eq!(type_arguments[0].as_type_variable(), Some("T"));
            assert_eq!(type_arguments[1].wildcard(), Wildcard::Extends);
        }

        #[test]
        fn unbounded_wildcard() {
            let signature = parse("(LAnnotatedWildcard<*>;)V");
            let parameter = &signature.parameter_types[0];
            assert_eq!(
                parameter.descriptor(),
                Some(FieldType::Object(ClassRef::new("AnnotatedWildcard")))
            );
            let type_argument = &parameter.type_arguments()[0];
            assert_eq!(type_argument.wildcard(), Wildcard::Unbounded);
            assert_eq!(type_argument.descriptor(), Some(object()));
        }

        #[test]
        fn extends_wildcard() {
            let signature = parse("(Ljava/util/Set<+Ljava/lang/Object;>;)V");
            let type_argument = &signature.parameter_types[0].type_arguments()[0];
            assert_eq!(type_argument.descriptor(), Some(object()));
            assert_eq!(type_argument.wildcard(), Wildcard::Extends);
        }

        #[test]
        fn super_wildcard() {
            let signature = parse("(Ljava/util/Set<-Ljava/lang/Object;>;)V");
            let type_argument = &signature.parameter_types[0].type_arguments()[0];
            assert_eq!(type_argument.descriptor(), Some(object()));
            assert_eq!(type_argument.wildcard(), Wildcard::Super);
        }

        #[test]
        fn array_type_argument() {
            let signature = parse("(LArraySameType$Lib<[Ljava/lang/Object;>;)V");
            let type_argument = &signature.parameter_types[0].type_arguments()[0];
            assert_eq!(type_argument.wildcard(), Wildcard::Exact);
            let descriptor = type_argument.descriptor().unwrap();
            assert_eq!(descriptor.component_type(), Some(&object()));
        }

        #[test]
        fn wildcard_is_attached_after_array() {
            let signature = parse("(LLib<-[[TT;>;)V");
            let type_argument = &signature.parameter_types[0].type_arguments()[0];
            assert_eq!(type_argument.wildcard(), Wildcard::Super);
            assert_eq!(type_argument.array_dimensions(), 2);
            assert_eq!(type_argument.as_type_variable(), Some("T"));
        }
    }

    #[test]
    fn multiple_bounds() {
        let signature = parse(concat!(
            "<T:Ljava/lang/Object;>",
            "(LMultiplePathsToTypeVariable$TBounded<TT;+TT;>;)Ljava/lang/Object;",
        ));
        let type_arguments = signature.parameter_types[0].type_arguments();
        assert_eq!(type_arguments.len(), 2);
        assert_eq!(type_arguments[0].as_type_variable(), Some("T"));
        assert_eq!(type_arguments[0].wildcard(), Wildcard::Exact);
        assert_eq!(type_arguments[1].as_type_variable(), Some("T"));
        assert_eq!(type_arguments[1].wildcard(), Wildcard::Extends);
    }

    #[test]
    fn interface_only_bounds() {
        let signature = parse("<T::Ljava/lang/Comparable<TT;>;:Ljava/io/Serializable;>(TT;)V");
        let type_parameter = &signature.type_parameters[0];
        assert_eq!(type_parameter.class_bound, None);
        assert_eq!(type_parameter.interface_bounds.len(), 2);
        assert_eq!(
            signature.erasure_of("T"),
            FieldType::Object(ClassRef::new("java/lang/Comparable"))
        );
    }

    #[test]
    fn inner_classes_of_parameterized_types() {
        let text = "(LNotNullMarkedAnnotatedInnerOfParameterized<TT;>.Nested;\
                     LNotNullMarkedAnnotatedInnerOfParameterized<*>.Nested.DoublyNested;\
                     LNotNullMarkedAnnotatedInnerOfParameterized$Lib<\
                     LNotNullMarkedAnnotatedInnerOfParameterized<*>.Nested.DoublyNested;>;)V";
        let signature = parse(text);
        assert_eq!(signature.parameter_types.len(), 3);

        let nested = signature.parameter_types[0].as_class_type().unwrap();
        assert_eq!(
            nested.binary_name(),
            "NotNullMarkedAnnotatedInnerOfParameterized$Nested"
        );
        assert!(nested.type_arguments().is_empty());
        assert_eq!(
            nested.segments[0].type_arguments,
            vec![TypeArgument::type_variable("T")]
        );

        let doubly_nested = signature.parameter_types[1].as_class_type().unwrap();
        assert_eq!(doubly_nested.segments.len(), 3);

        let lib = &signature.parameter_types[2];
        let inner = lib.type_arguments()[0].as_class_type().unwrap();
        assert_eq!(
            inner.binary_name(),
            "NotNullMarkedAnnotatedInnerOfParameterized$Nested$DoublyNested"
        );
        assert_eq!(
            inner.segments[0].type_arguments,
            vec![TypeArgument::unbounded()]
        );
        assert_eq!(signature.to_string(), text);
    }

    #[test]
    fn thrown_types() {
        let signature = parse("<X:Ljava/lang/Throwable;>()V^TX;^Ljava/io/IOException;");
        assert_eq!(signature.exception_types.len(), 2);
        assert_eq!(signature.exception_types[0].as_type_variable(), Some("X"));
    }

    #[test]
    fn field_signature() {
        let signature: FieldSignature = "Ljava/util/List<[I>;".parse().unwrap();
        let type_argument = &signature.field_type.type_arguments()[0];
        assert_eq!(
            type_argument,
            &TypeArgument::Concrete {
                wildcard: Wildcard::Exact,
                element: ElementType::Base(PrimitiveType::Int),
                array_dimensions: 1,
            }
        );
        assert!("I".parse::<FieldSignature>().is_err());
    }

    #[test]
    fn class_signature() {
        let text = concat!(
            "<E:Ljava/lang/Object;>Ljava/util/AbstractList<TE;>;",
            "Ljava/util/List<TE;>;Ljava/util/RandomAccess;",
        );
        let signature: ClassSignature = text.parse().unwrap();
        assert_eq!(signature.super_class.binary_name(), "java/util/AbstractList");
        assert_eq!(signature.interfaces.len(), 2);
        assert_eq!(signature.to_string(), text);
    }

    #[test]
    fn malformed_signatures() {
        let cases = [
            ("", MalformedKind::PrematureEnd),
            ("(", MalformedKind::PrematureEnd),
            ("(Ljava/lang/Object", MalformedKind::PrematureEnd),
            ("(Q)V", MalformedKind::UnexpectedCharacter('Q')),
            ("(Ljava/util/Set<>;)V", MalformedKind::UnexpectedCharacter('>')),
            ("()VV", MalformedKind::TrailingData),
            ("<T>()V", MalformedKind::UnexpectedCharacter('>')),
        ];
        for (text, kind) in cases {
            let error = text.parse::<MethodSignature>().unwrap_err();
            assert_eq!(error.kind, kind, "{text}");
        }
    }

    fn nested_lists(depth: usize) -> String {
        format!("(Lz;{}La;{})V", "La<".repeat(depth), ">;".repeat(depth))
    }

    #[test]
    fn array_dimensions_are_counted_without_recursion() {
        let deepest = format!("({}I)V", "[".repeat(255));
        let signature = parse(&deepest);
        assert_eq!(signature.parameter_types[0].array_dimensions(), 255);

        let error = format!("({}I)V", "[".repeat(65_000))
            .parse::<MethodSignature>()
            .unwrap_err();
        assert_eq!(error.kind, MalformedKind::TooManyDimensions);
        assert_eq!(error.position, 256);

        let error = format!("Ljava/util/List<{}Ljava/lang/Object;>;", "[".repeat(300))
            .parse::<FieldSignature>()
            .unwrap_err();
        assert_eq!(error.kind, MalformedKind::TooManyDimensions);
    }

    #[test]
    fn type_argument_nesting_is_limited() {
        let deepest = parse(&nested_lists(MAX_NESTING_DEPTH));
        assert_eq!(deepest.parameter_types.len(), 2);
        assert_eq!(deepest.to_string(), nested_lists(MAX_NESTING_DEPTH));

        for depth in [MAX_NESTING_DEPTH + 1, 21_000] {
            let error = nested_lists(depth).parse::<MethodSignature>().unwrap_err();
            assert_eq!(error.kind, MalformedKind::TooDeeplyNested);
            assert_eq!(error.position, 4 + 3 * MAX_NESTING_DEPTH + 2);
        }
        let error = format!("<T:{}Ljava/lang/Object;>()V", "La<".repeat(100))
            .parse::<MethodSignature>()
            .unwrap_err();
        assert_eq!(error.kind, MalformedKind::TooDeeplyNested);
    }

    #[test]
    fn error_reports_position() {
        let error = "(Ljava/util/Set<Q>;)V".parse::<MethodSignature>().unwrap_err();
        assert_eq!(error.position, 16);
        assert_eq!(error.kind, MalformedKind::UnexpectedCharacter('Q'));
    }

    proptest! {
        #[test]
        fn display_round_trip(signature in arb_method_signature()) {
            let text = signature.to_string();
            let parsed: MethodSignature = text.parse().expect("Failed to parse signature");
            assert_eq!(parsed, signature);
        }
    }
}
