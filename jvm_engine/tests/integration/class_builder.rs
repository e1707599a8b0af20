//! Assembles minimal class files for the scenario tests.
//! https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.1

use std::collections::HashMap;

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;

const JAVA_8_MAJOR: u16 = 52;

/// One entry of a method's exception table.
pub struct Handler {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    /// None catches everything, like `finally`.
    pub catch_type: Option<&'static str>,
}

pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub handlers: Vec<Handler>,
    // (start_pc, line_number)
    pub lines: Vec<(u16, u16)>,
}

impl Code {
    pub fn new(max_stack: u16, max_locals: u16, code: Vec<u8>) -> Code {
        Code {
            max_stack,
            max_locals,
            code,
            handlers: Vec::new(),
            lines: Vec::new(),
        }
    }

    pub fn handler(mut self, start_pc: u16, end_pc: u16, handler_pc: u16, catch_type: Option<&'static str>) -> Code {
        self.handlers.push(Handler {
            start_pc,
            end_pc,
            handler_pc,
            catch_type,
        });
        self
    }

    pub fn line(mut self, start_pc: u16, line_number: u16) -> Code {
        self.lines.push((start_pc, line_number));
        self
    }
}

pub struct ClassBuilder {
    access_flags: u16,
    major_version: u16,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    constants: Vec<u8>,
    constant_count: u16,
    known: HashMap<Vec<u8>, u16>,
    fields: Vec<Vec<u8>>,
    methods: Vec<Vec<u8>>,
    source_file: Option<u16>,
}

impl ClassBuilder {
    pub fn new(name: &str) -> ClassBuilder {
        ClassBuilder::with_super(name, "java/lang/Object")
    }

    pub fn with_super(name: &str, super_class: &str) -> ClassBuilder {
        let mut builder = ClassBuilder {
            access_flags: ACC_PUBLIC | ACC_SUPER,
            major_version: JAVA_8_MAJOR,
            this_class: 0,
            super_class: 0,
            interfaces: Vec::new(),
            constants: Vec::new(),
            constant_count: 1,
            known: HashMap::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            source_file: None,
        };
        builder.this_class = builder.class(name);
        builder.super_class = builder.class(super_class);
        builder
    }

    pub fn interface(name: &str) -> ClassBuilder {
        let mut builder = ClassBuilder::new(name);
        builder.access_flags = ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT;
        builder
    }

    pub fn implements(mut self, interface: &str) -> ClassBuilder {
        let index = self.class(interface);
        self.interfaces.push(index);
        self
    }

    pub fn major_version(mut self, major_version: u16) -> ClassBuilder {
        self.major_version = major_version;
        self
    }

    pub fn source_file(mut self, file_name: &str) -> ClassBuilder {
        let index = self.utf8(file_name);
        self.source_file = Some(index);
        self
    }

    // equal entries share one index, the way javac writes them
    fn constant(&mut self, bytes: Vec<u8>, slots: u16) -> u16 {
        if let Some(index) = self.known.get(&bytes) {
            return *index;
        }
        let index = self.constant_count;
        self.constants.extend_from_slice(&bytes);
        self.constant_count += slots;
        self.known.insert(bytes, index);
        index
    }

    fn tagged(tag: u8, parts: &[u16]) -> Vec<u8> {
        let mut bytes = vec![tag];
        for part in parts {
            bytes.extend_from_slice(&part.to_be_bytes());
        }
        bytes
    }

    pub fn utf8(&mut self, value: &str) -> u16 {
        let mut bytes = vec![1];
        bytes.extend_from_slice(&(value.len() as u16).to_be_bytes());
        bytes.extend_from_slice(value.as_bytes());
        self.constant(bytes, 1)
    }

    pub fn integer(&mut self, value: i32) -> u16 {
        let mut bytes = vec![3];
        bytes.extend_from_slice(&value.to_be_bytes());
        self.constant(bytes, 1)
    }

    pub fn float(&mut self, value: f32) -> u16 {
        let mut bytes = vec![4];
        bytes.extend_from_slice(&value.to_be_bytes());
        self.constant(bytes, 1)
    }

    pub fn long(&mut self, value: i64) -> u16 {
        let mut bytes = vec![5];
        bytes.extend_from_slice(&value.to_be_bytes());
        self.constant(bytes, 2)
    }

    pub fn class(&mut self, name: &str) -> u16 {
        let name = self.utf8(name);
        self.constant(Self::tagged(7, &[name]), 1)
    }

    pub fn string(&mut self, value: &str) -> u16 {
        let value = self.utf8(value);
        self.constant(Self::tagged(8, &[value]), 1)
    }

    fn member(&mut self, tag: u8, class: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.class(class);
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        let name_and_type = self.constant(Self::tagged(12, &[name, descriptor]), 1);
        self.constant(Self::tagged(tag, &[class, name_and_type]), 1)
    }

    pub fn field_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        self.member(9, class, name, descriptor)
    }

    pub fn method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        self.member(10, class, name, descriptor)
    }

    pub fn interface_method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        self.member(11, class, name, descriptor)
    }

    pub fn field(mut self, access_flags: u16, name: &str, descriptor: &str) -> ClassBuilder {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&access_flags.to_be_bytes());
        bytes.extend_from_slice(&self.utf8(name).to_be_bytes());
        bytes.extend_from_slice(&self.utf8(descriptor).to_be_bytes());
        bytes.extend_from_slice(&0u16.to_be_bytes());
        self.fields.push(bytes);
        self
    }

    /// A method without code, for interfaces and abstract classes.
    pub fn abstract_method(mut self, name: &str, descriptor: &str) -> ClassBuilder {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(ACC_PUBLIC | ACC_ABSTRACT).to_be_bytes());
        bytes.extend_from_slice(&self.utf8(name).to_be_bytes());
        bytes.extend_from_slice(&self.utf8(descriptor).to_be_bytes());
        bytes.extend_from_slice(&0u16.to_be_bytes());
        self.methods.push(bytes);
        self
    }

    pub fn method(mut self, access_flags: u16, name: &str, descriptor: &str, code: Code) -> ClassBuilder {
        let code_attribute = self.code_attribute(code);
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&access_flags.to_be_bytes());
        bytes.extend_from_slice(&self.utf8(name).to_be_bytes());
        bytes.extend_from_slice(&self.utf8(descriptor).to_be_bytes());
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(&code_attribute);
        self.methods.push(bytes);
        self
    }

    pub fn static_method(self, name: &str, descriptor: &str, code: Code) -> ClassBuilder {
        self.method(ACC_PUBLIC | ACC_STATIC, name, descriptor, code)
    }

    /// `<init>()V` that only calls the constructor of the superclass.
    pub fn default_constructor(mut self, super_class: &str) -> ClassBuilder {
        let init = self.method_ref(super_class, "<init>", "()V");
        let [high, low] = init.to_be_bytes();
        // aload_0, invokespecial, return
        self.method(ACC_PUBLIC, "<init>", "()V", Code::new(1, 1, vec![0x2a, 0xb7, high, low, 0xb1]))
    }

    fn attribute(&mut self, name: &str, info: Vec<u8>) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&self.utf8(name).to_be_bytes());
        bytes.extend_from_slice(&(info.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&info);
        bytes
    }

    fn code_attribute(&mut self, code: Code) -> Vec<u8> {
        let mut info = Vec::new();
        info.extend_from_slice(&code.max_stack.to_be_bytes());
        info.extend_from_slice(&code.max_locals.to_be_bytes());
        info.extend_from_slice(&(code.code.len() as u32).to_be_bytes());
        info.extend_from_slice(&code.code);
        info.extend_from_slice(&(code.handlers.len() as u16).to_be_bytes());
        for handler in &code.handlers {
            let catch_type = match handler.catch_type {
                Some(class_name) => self.class(class_name),
                None => 0,
            };
            for part in [handler.start_pc, handler.end_pc, handler.handler_pc, catch_type] {
                info.extend_from_slice(&part.to_be_bytes());
            }
        }
        if code.lines.is_empty() {
            info.extend_from_slice(&0u16.to_be_bytes());
        } else {
            let mut table = Vec::new();
            table.extend_from_slice(&(code.lines.len() as u16).to_be_bytes());
            for (start_pc, line_number) in &code.lines {
                table.extend_from_slice(&start_pc.to_be_bytes());
                table.extend_from_slice(&line_number.to_be_bytes());
            }
            info.extend_from_slice(&1u16.to_be_bytes());
            let line_numbers = self.attribute("LineNumberTable", table);
            info.extend_from_slice(&line_numbers);
        }
        self.attribute("Code", info)
    }

    pub fn build(mut self) -> Vec<u8> {
        let source_file = self
            .source_file
            .map(|index| self.attribute("SourceFile", index.to_be_bytes().to_vec()));

        let mut bytes = vec![0xca, 0xfe, 0xba, 0xbe, 0, 0];
        bytes.extend_from_slice(&self.major_version.to_be_bytes());
        bytes.extend_from_slice(&self.constant_count.to_be_bytes());
        bytes.extend_from_slice(&self.constants);
        for part in [self.access_flags, self.this_class, self.super_class] {
            bytes.extend_from_slice(&part.to_be_bytes());
        }
        bytes.extend_from_slice(&(self.interfaces.len() as u16).to_be_bytes());
        for interface in &self.interfaces {
            bytes.extend_from_slice(&interface.to_be_bytes());
        }
        for members in [&self.fields, &self.methods] {
            bytes.extend_from_slice(&(members.len() as u16).to_be_bytes());
            for member in members {
                bytes.extend_from_slice(member);
            }
        }
        match source_file {
            Some(attribute) => {
                bytes.extend_from_slice(&1u16.to_be_bytes());
                bytes.extend_from_slice(&attribute);
            }
            None => bytes.extend_from_slice(&0u16.to_be_bytes()),
        }
        bytes
    }
}

/// Big-endian operand bytes of a constant pool index.
pub fn index(index: u16) -> [u8; 2] {
    index.to_be_bytes()
}
