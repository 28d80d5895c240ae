//! The in-memory module graph.
//!
//! [`Module`] is an arena: types, fields, methods and properties live in flat vectors and
//! reference each other through [`Token`]s, while references to anything outside the module
//! are assembly-qualified [`TypeRef`]/[`FieldRef`]/[`MethodRef`] values. The whole graph is
//! mutated in memory by the weaver and persisted in one step afterwards (see
//! [`Module::write_to_file`](crate::Module::write_to_file)).
//!
//! # Examples
//!
//! ```rust
//! use dotweave::{Module, metadata::typesystem::TypeAttributes};
//!
//! let mut module = Module::new("Contracts");
//! let contractor = module.add_type("Contracts", "Contractor", TypeAttributes::PUBLIC, None)?;
//! assert_eq!(module.find_type("Contracts.Contractor"), Some(contractor));
//! assert_eq!(module.type_ref(contractor)?.to_string(), "[Contracts]Contracts.Contractor");
//! # Ok::<(), dotweave::Error>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    metadata::{
        field::{FieldAttributes, FieldDef, FieldRef},
        method::{MethodAttributes, MethodBody, MethodDef, MethodRef, Param},
        property::PropertyDef,
        token::Token,
        typesystem::{TypeAttributes, TypeDef, TypeRef},
    },
    Result,
};

/// A compiled module: the unit the weaver reads, mutates and writes back.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Module {
    /// Name of the module, used as the scope of every [`TypeRef`] into it
    pub name: String,
    /// Names of the modules this module references
    #[serde(default)]
    pub references: Vec<String>,
    /// Type definitions, indexed by `TypeDef` token row
    #[serde(default)]
    pub types: Vec<TypeDef>,
    /// Field definitions, indexed by `Field` token row
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    /// Method definitions, indexed by `MethodDef` token row
    #[serde(default)]
    pub methods: Vec<MethodDef>,
    /// Property definitions, indexed by `Property` token row
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
    /// Opaque debug symbol stream, carried through rewrites untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbols: Option<Vec<u8>>,
}

/// Largest row a [`Token`] can address
const MAX_ROW: u32 = 0x00FF_FFFF;

/// Row of the next definition appended to a table holding `len` rows
fn next_row(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len + 1)
        .ok()
        .filter(|&row| row <= MAX_ROW)
        .ok_or_else(|| malformed_error!("{} table is full ({} rows)", what, len))
}

macro_rules! arena_accessors {
    ($get:ident, $get_mut:ident, $vec:ident, $ty:ty, $table:expr, $what:literal) => {
        #[doc = concat!("Look up a ", $what, " definition by token")]
        ///
        /// # Errors
        ///
        /// Returns [`crate::Error::Malformed`] if the token does not name a row of this module.
        pub fn $get(&self, token: Token) -> Result<&$ty> {
            token
                .index()
                .filter(|_| token.table() == $table)
                .and_then(|index| self.$vec.get(index))
                .ok_or_else(|| {
                    malformed_error!("{} token {} is not defined in {}", $what, token, self.name)
                })
        }

        #[doc = concat!("Mutable access to a ", $what, " definition by token")]
        ///
        /// # Errors
        ///
        /// Returns [`crate::Error::Malformed`] if the token does not name a row of this module.
        pub fn $get_mut(&mut self, token: Token) -> Result<&mut $ty> {
            let name = &self.name;
            token
                .index()
                .filter(|_| token.table() == $table)
                .and_then(|index| self.$vec.get_mut(index))
                .ok_or_else(|| {
                    malformed_error!("{} token {} is not defined in {}", $what, token, name)
                })
        }
    };
}

impl Module {
    /// Create an empty module named `name`
    pub fn new(name: impl Into<String>) -> Self {
        Module {
            name: name.into(),
            ..Module::default()
        }
    }

    arena_accessors!(type_def, type_def_mut, types, TypeDef, Token::TYPE_DEF, "type");
    arena_accessors!(field, field_mut, fields, FieldDef, Token::FIELD, "field");
    arena_accessors!(method, method_mut, methods, MethodDef, Token::METHOD_DEF, "method");
    arena_accessors!(property, property_mut, properties, PropertyDef, Token::PROPERTY, "property");

    /// Add a top-level type definition and return its token
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the type table is full.
    pub fn add_type(
        &mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        flags: TypeAttributes,
        base: Option<TypeRef>,
    ) -> Result<Token> {
        let token = Token::type_def(next_row(self.types.len(), "type")?);
        self.types
            .push(TypeDef::new(token, namespace, name, flags, base));
        Ok(token)
    }

    /// Add a type nested in `declaring_type` and return its token
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if `declaring_type` is not defined here or the
    /// table is full.
    pub fn add_nested_type(
        &mut self,
        declaring_type: Token,
        name: impl Into<String>,
        flags: TypeAttributes,
        base: Option<TypeRef>,
    ) -> Result<Token> {
        self.type_def(declaring_type)?;
        let token = self.add_type("", name, flags, base)?;
        self.type_def_mut(token)?.declaring_type = Some(declaring_type);
        Ok(token)
    }

    /// Add a field to `declaring_type` and return its token
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if `declaring_type` is not defined here or the
    /// table is full.
    pub fn add_field(
        &mut self,
        declaring_type: Token,
        name: impl Into<String>,
        field_type: TypeRef,
        flags: FieldAttributes,
    ) -> Result<Token> {
        let token = Token::field(next_row(self.fields.len(), "field")?);
        self.type_def_mut(declaring_type)?.fields.push(token);
        self.fields.push(FieldDef {
            token,
            name: name.into(),
            field_type,
            flags,
            declaring_type,
        });
        Ok(token)
    }

    /// Add a method to `declaring_type` and return its token
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if `declaring_type` is not defined here or the
    /// table is full.
    pub fn add_method(
        &mut self,
        declaring_type: Token,
        name: impl Into<String>,
        flags: MethodAttributes,
        params: Vec<Param>,
        return_type: Option<TypeRef>,
        body: Option<MethodBody>,
    ) -> Result<Token> {
        let token = Token::method_def(next_row(self.methods.len(), "method")?);
        self.type_def_mut(declaring_type)?.methods.push(token);
        self.methods.push(MethodDef {
            token,
            name: name.into(),
            flags,
            params,
            return_type,
            declaring_type,
            body,
        });
        Ok(token)
    }

    /// Add a property to `declaring_type` and return its token
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if `declaring_type` is not defined here or the
    /// table is full.
    pub fn add_property(
        &mut self,
        declaring_type: Token,
        name: impl Into<String>,
        property_type: TypeRef,
        getter: Option<Token>,
        setter: Option<Token>,
    ) -> Result<Token> {
        let token = Token::property(next_row(self.properties.len(), "property")?);
        self.type_def_mut(declaring_type)?.properties.push(token);
        self.properties.push(PropertyDef {
            token,
            name: name.into(),
            property_type,
            getter,
            setter,
            declaring_type,
        });
        Ok(token)
    }

    /// Every type definition of the module, nested types included, in declaration order
    pub fn all_types(&self) -> Vec<Token> {
        self.types.iter().map(|t| t.token).collect()
    }

    /// Types directly nested in `declaring_type`
    pub fn nested_types(&self, declaring_type: Token) -> Vec<Token> {
        self.types
            .iter()
            .filter(|t| t.declaring_type == Some(declaring_type))
            .map(|t| t.token)
            .collect()
    }

    /// Find a type definition by full name (`Namespace.Outer/Inner`)
    pub fn find_type(&self, full_name: &str) -> Option<Token> {
        self.types
            .iter()
            .find(|t| {
                self.type_ref(t.token)
                    .is_ok_and(|reference| reference.is(full_name))
            })
            .map(|t| t.token)
    }

    /// Full name of a type definition, `Namespace.Outer/Inner` for nested types
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the token or one of its enclosing types is not
    /// defined here.
    pub fn type_full_name(&self, token: Token) -> Result<String> {
        Ok(self.type_ref(token)?.full_name())
    }

    /// A reference to the type definition `token`, scoped to this module
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the token or one of its enclosing types is not
    /// defined here, or if the nesting chain loops.
    pub fn type_ref(&self, token: Token) -> Result<TypeRef> {
        let mut current = self.type_def(token)?;
        let mut name = current.name.clone();
        let mut depth = 0;
        while let Some(outer) = current.declaring_type {
            depth += 1;
            if depth > self.types.len() {
                return Err(malformed_error!(
                    "type {} of {} is nested in itself",
                    token,
                    self.name
                ));
            }
            current = self.type_def(outer)?;
            name = format!("{}/{}", current.name, name);
        }
        Ok(TypeRef::new(&self.name, &current.namespace, name))
    }

    /// A reference to the field definition `token`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the field or its declaring type is not defined here.
    pub fn field_ref(&self, token: Token) -> Result<FieldRef> {
        let field = self.field(token)?;
        Ok(FieldRef {
            declaring: self.type_ref(field.declaring_type)?,
            name: field.name.clone(),
            field_type: field.field_type.clone(),
        })
    }

    /// A reference to the method definition `token`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the method or its declaring type is not defined here.
    pub fn method_ref(&self, token: Token) -> Result<MethodRef> {
        let method = self.method(token)?;
        Ok(MethodRef {
            declaring: self.type_ref(method.declaring_type)?,
            name: method.name.clone(),
            params: method.params.iter().map(|p| p.param_type.clone()).collect(),
            has_this: !method.is_static(),
            return_type: method.return_type.clone(),
        })
    }

    /// Find the field named `name` declared directly on `declaring_type`
    pub fn find_field(&self, declaring_type: Token, name: &str) -> Option<Token> {
        let declaring = self.type_def(declaring_type).ok()?;
        declaring
            .fields
            .iter()
            .copied()
            .find(|&f| self.field(f).is_ok_and(|field| field.name == name))
    }

    /// Find a method by name and parameter count declared directly on `declaring_type`
    pub fn find_method(&self, declaring_type: Token, name: &str, param_count: usize) -> Option<Token> {
        let declaring = self.type_def(declaring_type).ok()?;
        declaring.methods.iter().copied().find(|&m| {
            self.method(m)
                .is_ok_and(|method| method.name == name && method.params.len() == param_count)
        })
    }

    /// Find the property named `name` declared directly on `declaring_type`
    pub fn find_property(&self, declaring_type: Token, name: &str) -> Option<Token> {
        let declaring = self.type_def(declaring_type).ok()?;
        declaring
            .properties
            .iter()
            .copied()
            .find(|&p| self.property(p).is_ok_and(|property| property.name == name))
    }

    /// Record that this module references `module`
    pub fn add_reference(&mut self, module: &str) {
        if module != self.name && !self.references.iter().any(|r| r == module) {
            self.references.push(module.to_string());
        }
    }

    /// Import a type reference, registering its module as a reference of this module
    pub fn import_type(&mut self, reference: &TypeRef) -> TypeRef {
        self.add_reference(&reference.module);
        for arg in &reference.generic_args {
            self.add_reference(&arg.module);
        }
        reference.clone()
    }

    /// Import a field reference, registering the modules it mentions as references
    pub fn import_field(&mut self, reference: &FieldRef) -> FieldRef {
        self.import_type(&reference.declaring);
        self.import_type(&reference.field_type);
        reference.clone()
    }

    /// Import a method reference, registering the modules it mentions as references
    pub fn import_method(&mut self, reference: &MethodRef) -> MethodRef {
        self.import_type(&reference.declaring);
        for param in &reference.params {
            self.import_type(param);
        }
        if let Some(return_type) = &reference.return_type {
            self.import_type(return_type);
        }
        reference.clone()
    }
}
