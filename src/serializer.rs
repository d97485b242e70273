// Typed record writing. This is an extra on top of the field-by-field
// writer: one `Serialize` value becomes one record, with nested sequences
// flattened into it. Maps and enum variants carrying more than one value
// have no flat shape and are rejected.
use std::io;

use serde::ser::{
    Impossible, Serialize, SerializeSeq, SerializeStruct, SerializeTuple,
    SerializeTupleStruct, Serializer,
};

use crate::error::Error;
use crate::writer::Writer;

/// Write `value` as fields of the current record.
///
/// With `header_only` set, only struct field names are written and every
/// value is skipped. Returns true if at least one field name was written.
pub fn serialize<S: ?Sized + Serialize, W: io::Write>(
    wtr: &mut Writer<W>,
    value: &S,
    header_only: bool,
) -> Result<bool, Error> {
    let mut flat = Flattener { wtr, header_only, names: 0 };
    value.serialize(&mut flat)?;
    Ok(flat.names > 0)
}

struct Flattener<'w, W: io::Write> {
    wtr: &'w mut Writer<W>,
    header_only: bool,
    names: usize,
}

impl<'w, W: io::Write> Flattener<'w, W> {
    fn value<T: AsRef<[u8]>>(&mut self, text: T) -> Result<(), Error> {
        if self.header_only {
            return Ok(());
        }
        self.wtr.write_field(text)
    }
}

fn unsupported(what: &str) -> Error {
    Error::Serialize(format!("cannot write {} as a CSV record", what))
}

macro_rules! integers {
    ($($method:ident: $ty:ty),*) => {
        $(
            fn $method(self, v: $ty) -> Result<(), Error> {
                self.value(itoa::Buffer::new().format(v))
            }
        )*
    };
}

macro_rules! floats {
    ($($method:ident: $ty:ty),*) => {
        $(
            fn $method(self, v: $ty) -> Result<(), Error> {
                self.value(ryu::Buffer::new().format(v))
            }
        )*
    };
}

impl<'a, 'w, W: io::Write> Serializer for &'a mut Flattener<'w, W> {
    type Ok = ();
    type Error = Error;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Impossible<(), Error>;
    type SerializeMap = Impossible<(), Error>;
    type SerializeStruct = Self;
    type SerializeStructVariant = Impossible<(), Error>;

    integers!(
        serialize_i8: i8, serialize_i16: i16, serialize_i32: i32,
        serialize_i64: i64, serialize_i128: i128,
        serialize_u8: u8, serialize_u16: u16, serialize_u32: u32,
        serialize_u64: u64, serialize_u128: u128
    );
    floats!(serialize_f32: f32, serialize_f64: f64);

    fn serialize_bool(self, v: bool) -> Result<(), Error> {
        self.value(if v { "true" } else { "false" })
    }

    fn serialize_char(self, v: char) -> Result<(), Error> {
        self.value(v.encode_utf8(&mut [0; 4]).as_bytes())
    }

    fn serialize_str(self, v: &str) -> Result<(), Error> {
        self.value(v)
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<(), Error> {
        self.value(v)
    }

    fn serialize_none(self) -> Result<(), Error> {
        self.value(b"")
    }

    fn serialize_some<T: ?Sized + Serialize>(
        self,
        v: &T,
    ) -> Result<(), Error> {
        v.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), Error> {
        self.value(b"")
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<(), Error> {
        self.value(name)
    }

    fn serialize_unit_variant(
        self,
        _: &'static str,
        _: u32,
        variant: &'static str,
    ) -> Result<(), Error> {
        self.value(variant)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        v: &T,
    ) -> Result<(), Error> {
        v.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        v: &T,
    ) -> Result<(), Error> {
        v.serialize(self)
    }

    fn serialize_seq(self, _: Option<usize>) -> Result<Self, Error> {
        Ok(self)
    }

    fn serialize_tuple(self, _: usize) -> Result<Self, Error> {
        Ok(self)
    }

    fn serialize_tuple_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> Result<Self, Error> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Impossible<(), Error>, Error> {
        Err(unsupported("an enum tuple variant"))
    }

    fn serialize_map(
        self,
        _: Option<usize>,
    ) -> Result<Impossible<(), Error>, Error> {
        Err(unsupported("a map"))
    }

    fn serialize_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> Result<Self, Error> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Impossible<(), Error>, Error> {
        Err(unsupported("an enum struct variant"))
    }
}

// Sequences, tuples and tuple structs all append their elements in order.
macro_rules! flatten_elements {
    ($($tr:ident :: $method:ident),*) => {
        $(
            impl<'a, 'w, W: io::Write> $tr for &'a mut Flattener<'w, W> {
                type Ok = ();
                type Error = Error;

                fn $method<T: ?Sized + Serialize>(
                    &mut self,
                    v: &T,
                ) -> Result<(), Error> {
                    v.serialize(&mut **self)
                }

                fn end(self) -> Result<(), Error> {
                    Ok(())
                }
            }
        )*
    };
}

flatten_elements!(
    SerializeSeq::serialize_element,
    SerializeTuple::serialize_element,
    SerializeTupleStruct::serialize_field
);

impl<'a, 'w, W: io::Write> SerializeStruct for &'a mut Flattener<'w, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        v: &T,
    ) -> Result<(), Error> {
        if !self.header_only {
            return v.serialize(&mut **self);
        }
        self.names += 1;
        self.wtr.write_field(key)
    }

    fn end(self) -> Result<(), Error> {
        Ok(())
    }
}
