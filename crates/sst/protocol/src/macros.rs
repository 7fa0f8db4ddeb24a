/// Declares a consensus struct together with its codec and reflected schema,
/// so wire order and schema order always agree.
macro_rules! wire_struct {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                pub $field:ident : $ty:ty
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        pub struct $name {
            $(
                $(#[$field_meta])*
                pub $field: $ty,
            )+
        }

        impl $crate::codec::Encodable for $name {
            fn encode(&self, out: &mut dyn ::bytes::BufMut) {
                $( $crate::codec::Encodable::encode(&self.$field, out); )+
            }

            fn length(&self) -> usize {
                0 $( + $crate::codec::Encodable::length(&self.$field) )+
            }
        }

        impl $crate::codec::Decodable for $name {
            fn decode(buf: &mut &[u8]) -> Result<Self, $crate::codec::CodecError> {
                Ok(Self {
                    $( $field: $crate::codec::Decodable::decode(buf)?, )+
                })
            }
        }

        impl $crate::schema::Reflect for $name {
            const NAME: &'static str = stringify!($name);
            const FIELDS: &'static [$crate::schema::FieldSchema] = &[
                $(
                    $crate::schema::FieldSchema {
                        name: stringify!($field),
                        type_name: stringify!($ty),
                    },
                )+
            ];
        }
    };
}

/// Declares an action family: the tagged union, its fieldless kind enum holding
/// the canonical ordinal table, and the codec, validation and schema glue.
///
/// Ordinals are written out explicitly. Members may only ever be appended.
macro_rules! action_family {
    (
        $(#[$meta:meta])*
        pub enum $name:ident / $kind:ident ($family:literal) {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident($ty:ty) = $ordinal:literal as $wire:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(tag = "type", content = "value")]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[serde(rename = $wire)]
                $variant($ty),
            )+
        }

        #[doc = concat!("Wire ordinals of [`", stringify!($name), "`].")]
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::strum::EnumIter,
            ::strum::EnumCount,
            ::strum::IntoStaticStr,
            ::strum::Display,
        )]
        #[repr(u32)]
        pub enum $kind {
            $(
                #[doc = concat!("`", $wire, "`")]
                #[strum(serialize = $wire)]
                $variant = $ordinal,
            )+
        }

        impl $kind {
            /// Family name used in errors and schemas.
            pub const FAMILY: &'static str = $family;

            /// Wire ordinal.
            pub const fn ordinal(self) -> u32 {
                self as u32
            }

            /// JSON and log name.
            pub fn name(self) -> &'static str {
                self.into()
            }
        }

        impl TryFrom<u32> for $kind {
            type Error = $crate::codec::CodecError;

            fn try_from(ordinal: u32) -> Result<Self, Self::Error> {
                match ordinal {
                    $( $ordinal => Ok(Self::$variant), )+
                    _ => Err($crate::codec::CodecError::UnknownActionType {
                        family: $family,
                        ordinal,
                    }),
                }
            }
        }

        impl $name {
            /// Kind of the carried action.
            pub const fn kind(&self) -> $kind {
                match self {
                    $( Self::$variant(_) => $kind::$variant, )+
                }
            }

            /// Wire ordinal of the carried action.
            pub const fn ordinal(&self) -> u32 {
                self.kind().ordinal()
            }

            /// JSON and log name of the carried action.
            pub fn name(&self) -> &'static str {
                self.kind().name()
            }

            /// Identifier: keccak256 of the canonical encoding.
            pub fn id(&self) -> ::alloy_primitives::B256 {
                ::alloy_primitives::keccak256($crate::codec::encode(self))
            }
        }

        impl $crate::codec::Encodable for $name {
            fn encode(&self, out: &mut dyn ::bytes::BufMut) {
                $crate::codec::encode_varint(self.ordinal(), out);
                match self {
                    $( Self::$variant(action) => $crate::codec::Encodable::encode(action, out), )+
                }
            }

            fn length(&self) -> usize {
                $crate::codec::varint_length(self.ordinal())
                    + match self {
                        $( Self::$variant(action) => $crate::codec::Encodable::length(action), )+
                    }
            }
        }

        impl $crate::codec::Decodable for $name {
            fn decode(buf: &mut &[u8]) -> Result<Self, $crate::codec::CodecError> {
                let kind = $kind::try_from($crate::codec::decode_varint(buf)?)?;
                Ok(match kind {
                    $( $kind::$variant => Self::$variant($crate::codec::Decodable::decode(buf)?), )+
                })
            }
        }

        impl $crate::validation::Validate for $name {
            fn validate(&self) -> Result<(), $crate::validation::ValidationError> {
                match self {
                    $( Self::$variant(action) => $crate::validation::Validate::validate(action), )+
                }
            }
        }

        impl $crate::schema::ReflectFamily for $name {
            fn family_schema() -> $crate::schema::FamilySchema {
                $crate::schema::FamilySchema {
                    family: $family,
                    variants: vec![
                        $(
                            $crate::schema::VariantSchema {
                                ordinal: $ordinal,
                                name: $wire,
                                payload: <$ty as $crate::schema::Reflect>::schema(),
                            },
                        )+
                    ],
                }
            }
        }

        $(
            impl From<$ty> for $name {
                fn from(action: $ty) -> Self {
                    Self::$variant(action)
                }
            }
        )+
    };
}
