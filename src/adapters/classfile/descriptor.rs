//! Class names referenced by field/method descriptors and generic
//! signatures. Both share one grammar here: a descriptor is a signature
//! without type arguments.

use super::ClassParseError;

/// Internal names of every class mentioned in `signature`, nested
/// generic types reported as `Outer$Inner`.
pub fn referenced_classes(signature: &str) -> Result<Vec<String>, ClassParseError> {
    let mut parser = SignatureParser::new(signature);
    parser.parse()?;
    Ok(parser.classes)
}

/// Element class of a class constant, which may name an array type.
pub fn class_constant(name: &str) -> Result<Option<String>, ClassParseError> {
    if name.starts_with('[') {
        Ok(referenced_classes(name)?.into_iter().next())
    } else {
        Ok(Some(name.to_string()))
    }
}

struct SignatureParser<'a> {
    bytes: &'a [u8],
    text: &'a str,
    pos: usize,
    classes: Vec<String>,
}

impl<'a> SignatureParser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            text,
            pos: 0,
            classes: Vec::new(),
        }
    }

    fn error(&self) -> ClassParseError {
        ClassParseError::InvalidDescriptor(self.text.to_string())
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn expect(&mut self, ch: u8) -> Result<(), ClassParseError> {
        if self.peek() != Some(ch) {
            return Err(self.error());
        }
        self.pos += 1;
        Ok(())
    }

    fn parse(&mut self) -> Result<(), ClassParseError> {
        if self.peek() == Some(b'<') {
            self.type_parameters()?;
        }
        if self.peek() == Some(b'(') {
            return self.method();
        }
        // Field descriptor/signature, or superclass followed by interfaces.
        while self.peek().is_some() {
            self.type_signature()?;
        }
        Ok(())
    }

    fn method(&mut self) -> Result<(), ClassParseError> {
        self.expect(b'(')?;
        while self.peek() != Some(b')') {
            if self.peek().is_none() {
                return Err(self.error());
            }
            self.type_signature()?;
        }
        self.pos += 1;
        self.type_signature()?;
        while self.peek() == Some(b'^') {
            self.pos += 1;
            self.type_signature()?;
        }
        if self.peek().is_some() {
            return Err(self.error());
        }
        Ok(())
    }

    fn type_parameters(&mut self) -> Result<(), ClassParseError> {
        self.expect(b'<')?;
        while self.peek() != Some(b'>') {
            self.identifier(b':')?;
            self.expect(b':')?;
            // Class bound may be empty, interface bounds follow a ':'.
            if matches!(self.peek(), Some(b'L' | b'T' | b'[')) {
                self.type_signature()?;
            }
            while self.peek() == Some(b':') {
                self.pos += 1;
                self.type_signature()?;
            }
        }
        self.pos += 1;
        Ok(())
    }

    fn identifier(&mut self, stop: u8) -> Result<&'a str, ClassParseError> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch == stop || matches!(ch, b'<' | b'.' | b';' | b'>') {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start || self.peek().is_none() {
            return Err(self.error());
        }
        Ok(&self.text[start..self.pos])
    }

    fn type_signature(&mut self) -> Result<(), ClassParseError> {
        match self.peek() {
            Some(b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b'V') => {
                self.pos += 1;
                Ok(())
            }
            Some(b'[') => {
                self.pos += 1;
                self.type_signature()
            }
            Some(b'T') => {
                self.pos += 1;
                self.identifier(b';')?;
                self.expect(b';')
            }
            Some(b'L') => self.class_type(),
            _ => Err(self.error()),
        }
    }

    fn class_type(&mut self) -> Result<(), ClassParseError> {
        self.expect(b'L')?;
        let mut name = self.identifier(b';')?.to_string();
        loop {
            match self.peek() {
                Some(b'<') => self.type_arguments()?,
                Some(b'.') => {
                    self.pos += 1;
                    name.push('$');
                    name.push_str(self.identifier(b';')?);
                }
                Some(b';') => {
                    self.pos += 1;
                    self.classes.push(name);
                    return Ok(());
                }
                _ => return Err(self.error()),
            }
        }
    }

    fn type_arguments(&mut self) -> Result<(), ClassParseError> {
        self.expect(b'<')?;
        while self.peek() != Some(b'>') {
            match self.peek() {
                Some(b'*') => self.pos += 1,
                Some(b'+' | b'-') => {
                    self.pos += 1;
                    self.type_signature()?;
                }
                Some(_) => self.type_signature()?,
                None => return Err(self.error()),
            }
        }
        self.pos += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_descriptor() {
        let classes = referenced_classes("(ILjava/lang/String;[Ljava/util/List;)Ljava/util/Map;").unwrap();
        assert_eq!(classes, vec!["java/lang/String", "java/util/List", "java/util/Map"]);
    }

    #[test]
    fn test_generic_class_signature() {
        let sig = "<K:Ljava/lang/Object;V::Ljava/lang/Comparable<-TV;>;>Ljava/util/AbstractMap<TK;TV;>;Ljava/io/Serializable;";
        let classes = referenced_classes(sig).unwrap();
        assert_eq!(
            classes,
            vec![
                "java/lang/Object",
                "java/lang/Comparable",
                "java/util/AbstractMap",
                "java/io/Serializable"
            ]
        );
    }

    #[test]
    fn test_inner_class_and_throws() {
        let sig = "<T:Ljava/lang/Object;>(Lp/Outer<TT;>.Inner<*>;)V^Ljava/io/IOException;^TE;";
        let classes = referenced_classes(sig).unwrap();
        assert_eq!(classes, vec!["java/lang/Object", "p/Outer$Inner", "java/io/IOException"]);
    }

    #[test]
    fn test_array_class_constant() {
        assert_eq!(class_constant("[[Lp/A;").unwrap(), Some("p/A".to_string()));
        assert_eq!(class_constant("[I").unwrap(), None);
        assert_eq!(class_constant("p/B").unwrap(), Some("p/B".to_string()));
    }

    #[test]
    fn test_malformed() {
        assert!(referenced_classes("Ljava/lang/String").is_err());
        assert!(referenced_classes("(I").is_err());
    }
}
