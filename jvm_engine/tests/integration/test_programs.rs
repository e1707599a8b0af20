use crate::class_builder::{index, ClassBuilder, Code, ACC_PUBLIC, ACC_STATIC};
use jvm_engine::class_finder::InMemoryClassPath;
use jvm_engine::interpreter::ExecutionOutcome;
use jvm_engine::jvm_error::VmError;
use jvm_engine::jvm_values::Value;
use jvm_engine::virtual_machine::{SharedBuffer, VirtualMachine, VmOptions};

struct Machine {
    vm: VirtualMachine,
    stdout: SharedBuffer,
    stderr: SharedBuffer,
}

fn machine_with_options(classes: Vec<(&str, Vec<u8>)>, options: VmOptions) -> Machine {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut vm = VirtualMachine::with_options(options);
    let mut class_path = InMemoryClassPath::new();
    for (name, bytes) in classes {
        class_path.add_class(name, bytes);
    }
    vm.add_class_path(Box::new(class_path));
    let stdout = SharedBuffer::new();
    let stderr = SharedBuffer::new();
    vm.set_stdout(Box::new(stdout.clone()));
    vm.set_stderr(Box::new(stderr.clone()));
    Machine { vm, stdout, stderr }
}

fn machine(classes: Vec<(&str, Vec<u8>)>) -> Machine {
    machine_with_options(classes, VmOptions::default())
}

impl Machine {
    fn call(&mut self, class_name: &str, method_name: &str, descriptor: &str, args: Vec<Value>) -> ExecutionOutcome {
        self.vm.invoke_static(class_name, method_name, descriptor, args)
    }
}

fn completed(value: Value) -> ExecutionOutcome {
    ExecutionOutcome::Completed(Some(value))
}

fn concat(parts: &[&[u8]]) -> Vec<u8> {
    parts.concat()
}

#[test]
fn uncaught_exception_prints_the_stack_trace() {
    let mut class = ClassBuilder::new("demo/Divide").source_file("Divide.java");
    let divide = index(class.method_ref("demo/Divide", "divide", "(II)I"));
    let class = class
        // iload_0, iload_1, idiv, ireturn
        .static_method("divide", "(II)I", Code::new(2, 2, vec![0x1a, 0x1b, 0x6c, 0xac]).line(0, 12))
        .static_method(
            "main",
            "([Ljava/lang/String;)V",
            // iconst_1, iconst_0, invokestatic divide, pop, return
            Code::new(2, 1, concat(&[&[0x04, 0x03, 0xb8], &divide, &[0x57, 0xb1]])).line(0, 5),
        )
        .build();
    let mut m = machine(vec![("demo/Divide", class)]);

    let outcome = m.vm.run_main("demo.Divide", &[]);
    assert!(matches!(outcome, ExecutionOutcome::UncaughtException(_)));
    assert_eq!(2, outcome.exit_code());
    assert_eq!("", m.stdout.contents());
    assert_eq!(
        "Exception in thread \"main\" java.lang.ArithmeticException: / by zero\n\
         \tat demo.Divide.divide(Divide.java:12) [pc 2]\n\
         \tat demo.Divide.main(Divide.java:5) [pc 2]\n",
        m.stderr.contents()
    );
}

#[test]
fn handlers_catch_by_class_and_across_frames() {
    let mut class = ClassBuilder::new("Handlers");
    let divide = index(class.method_ref("Handlers", "divide", "(II)I"));
    let class = class
        .static_method("divide", "(II)I", Code::new(2, 2, vec![0x1a, 0x1b, 0x6c, 0xac]))
        .static_method(
            "safeDivide",
            "(II)I",
            // iload_0, iload_1, idiv, ireturn; handler: pop, iconst_m1, ireturn
            Code::new(2, 2, vec![0x1a, 0x1b, 0x6c, 0xac, 0x57, 0x02, 0xac])
                .handler(0, 4, 4, Some("java/lang/ArithmeticException")),
        )
        .static_method(
            "callAndCatch",
            "()I",
            // iconst_1, iconst_0, invokestatic divide, ireturn; handler: pop, bipush 42, ireturn
            Code::new(2, 0, concat(&[&[0x04, 0x03, 0xb8], &divide, &[0xac, 0x57, 0x10, 42, 0xac]]))
                .handler(0, 6, 6, Some("java/lang/RuntimeException")),
        )
        .static_method(
            "catchAll",
            "()I",
            // aconst_null, arraylength, ireturn; handler: pop, iconst_5, ireturn
            Code::new(1, 0, vec![0x01, 0xbe, 0xac, 0x57, 0x08, 0xac]).handler(0, 3, 3, None),
        )
        .static_method(
            "wrongHandler",
            "()I",
            Code::new(1, 0, vec![0x01, 0xbe, 0xac, 0x57, 0x08, 0xac])
                .handler(0, 3, 3, Some("java/lang/ArithmeticException")),
        )
        .build();
    let mut m = machine(vec![("Handlers", class)]);

    assert_eq!(
        completed(Value::Int(3)),
        m.call("Handlers", "safeDivide", "(II)I", vec![Value::Int(7), Value::Int(2)])
    );
    assert_eq!(
        completed(Value::Int(-1)),
        m.call("Handlers", "safeDivide", "(II)I", vec![Value::Int(7), Value::Int(0)])
    );
    assert_eq!(completed(Value::Int(42)), m.call("Handlers", "callAndCatch", "()I", vec![]));
    assert_eq!(completed(Value::Int(5)), m.call("Handlers", "catchAll", "()I", vec![]));
    assert_eq!("", m.stderr.contents());

    let outcome = m.call("Handlers", "wrongHandler", "()I", vec![]);
    assert!(matches!(outcome, ExecutionOutcome::UncaughtException(_)));
    assert!(m
        .stderr
        .contents()
        .starts_with("Exception in thread \"main\" java.lang.NullPointerException"));
}

#[test]
fn array_errors_and_multi_dimensional_arrays() {
    let mut class = ClassBuilder::new("Arrays");
    let int3 = index(class.class("[[[I"));
    let int2 = index(class.class("[[I"));
    let int1 = index(class.class("[I"));
    let class = class
        // iconst_2, newarray int, iconst_5, iaload, ireturn
        .static_method("bounds", "()I", Code::new(2, 0, vec![0x05, 0xbc, 10, 0x08, 0x2e, 0xac]))
        .static_method(
            "outerLength",
            "()I",
            // iconst_3, iconst_0, iconst_4, multianewarray [[[I 3, arraylength, ireturn
            Code::new(3, 0, concat(&[&[0x06, 0x03, 0x07, 0xc5], &int3, &[3, 0xbe, 0xac]])),
        )
        .static_method(
            "collapsed",
            "()I",
            // ... instanceof [I, ireturn
            Code::new(3, 0, concat(&[&[0x06, 0x03, 0x07, 0xc5], &int3, &[3, 0xc1], &int1, &[0xac]])),
        )
        .static_method(
            "negative",
            "()I",
            // iconst_2, iconst_m1, multianewarray [[I 2, arraylength, ireturn
            Code::new(2, 0, concat(&[&[0x05, 0x02, 0xc5], &int2, &[2, 0xbe, 0xac]])),
        )
        .build();
    let mut m = machine(vec![("Arrays", class)]);

    assert!(matches!(
        m.call("Arrays", "bounds", "()I", vec![]),
        ExecutionOutcome::UncaughtException(_)
    ));
    assert!(m.stderr.contents().contains(
        "java.lang.ArrayIndexOutOfBoundsException: iaload: array length is 2 but array index is 5"
    ));
    assert_eq!(completed(Value::Int(3)), m.call("Arrays", "outerLength", "()I", vec![]));
    assert_eq!(completed(Value::Int(1)), m.call("Arrays", "collapsed", "()I", vec![]));
    assert!(matches!(
        m.call("Arrays", "negative", "()I", vec![]),
        ExecutionOutcome::UncaughtException(_)
    ));
    assert!(m.stderr.contents().contains("java.lang.NegativeArraySizeException"));
}

#[test]
fn huge_arrays_raise_out_of_memory() {
    let mut class = ClassBuilder::new("Huge");
    let max = class.integer(i32::MAX) as u8;
    let wide = class.integer(1 << 16) as u8;
    let string = index(class.class("java/lang/String"));
    let int2 = index(class.class("[[I"));
    let class = class
        // ldc MAX, newarray long, arraylength, ireturn
        .static_method("longs", "()I", Code::new(1, 0, vec![0x12, max, 0xbc, 11, 0xbe, 0xac]))
        .static_method(
            "strings",
            "()I",
            // ldc MAX, anewarray String, arraylength, ireturn
            Code::new(1, 0, concat(&[&[0x12, max, 0xbd], &string, &[0xbe, 0xac]])),
        )
        .static_method(
            "grid",
            "()I",
            // ldc 65536, ldc 65536, multianewarray [[I 2, arraylength, ireturn
            Code::new(2, 0, concat(&[&[0x12, wide, 0x12, wide, 0xc5], &int2, &[2, 0xbe, 0xac]])),
        )
        .static_method(
            "small",
            "()I",
            // bipush 100, newarray long, arraylength, ireturn
            Code::new(1, 0, vec![0x10, 100, 0xbc, 11, 0xbe, 0xac]),
        )
        .build();
    let mut m = machine(vec![("Huge", class)]);

    for method in ["longs", "strings", "grid"] {
        assert!(matches!(
            m.call("Huge", method, "()I", vec![]),
            ExecutionOutcome::UncaughtException(_)
        ));
    }
    assert_eq!(
        3,
        m.stderr
            .contents()
            .matches("java.lang.OutOfMemoryError: Java heap space")
            .count()
    );
    assert_eq!(completed(Value::Int(100)), m.call("Huge", "small", "()I", vec![]));
}

#[test]
fn casts_and_instanceof() {
    let mut class = ClassBuilder::new("Casts");
    let string = index(class.class("java/lang/String"));
    let char_sequence = index(class.class("java/lang/CharSequence"));
    let integer = index(class.class("java/lang/Integer"));
    let x = class.string("x") as u8;
    let class = class
        .static_method(
            "nullCasts",
            "()I",
            // aconst_null, checkcast String, instanceof String, ldc "x", instanceof CharSequence, iadd, ireturn
            Code::new(
                2,
                0,
                concat(&[&[0x01, 0xc0], &string, &[0xc1], &string, &[0x12, x, 0xc1], &char_sequence, &[0x60, 0xac]]),
            ),
        )
        .static_method(
            "badCast",
            "()V",
            // ldc "x", checkcast Integer, pop, return
            Code::new(1, 0, concat(&[&[0x12, x, 0xc0], &integer, &[0x57, 0xb1]])),
        )
        .build();
    let mut m = machine(vec![("Casts", class)]);

    assert_eq!(completed(Value::Int(1)), m.call("Casts", "nullCasts", "()I", vec![]));
    assert!(matches!(
        m.call("Casts", "badCast", "()V", vec![]),
        ExecutionOutcome::UncaughtException(_)
    ));
    assert!(m.stderr.contents().contains(
        "java.lang.ClassCastException: class java.lang.String cannot be cast to class java.lang.Integer"
    ));
}

#[test]
fn numeric_semantics() {
    let mut class = ClassBuilder::new("Numbers");
    let three = class.float(3.0) as u8;
    let max = class.integer(i32::MAX) as u8;
    let ten = index(class.long(10));
    let class = class
        // fconst_1, ldc 3.0f, fdiv, freturn
        .static_method("third", "()F", Code::new(2, 0, vec![0x0c, 0x12, three, 0x6e, 0xae]))
        // fconst_0, fconst_0, fdiv, f2i, ireturn
        .static_method("nanToInt", "()I", Code::new(2, 0, vec![0x0b, 0x0b, 0x6e, 0x8b, 0xac]))
        // ldc Integer.MAX_VALUE, iconst_1, iadd, ireturn
        .static_method("overflow", "()I", Code::new(2, 0, vec![0x12, max, 0x04, 0x60, 0xac]))
        .static_method(
            "dup2x2",
            "()J",
            // ldc2_w 10L, lconst_1, dup2_x2, lsub, lmul, lreturn
            Code::new(6, 0, concat(&[&[0x14], &ten, &[0x0a, 0x5e, 0x65, 0x69, 0xad]])),
        )
        // lconst_1, lconst_0, ldiv, lreturn
        .static_method("longDivide", "()J", Code::new(4, 0, vec![0x0a, 0x09, 0x6d, 0xad]))
        .build();
    let mut m = machine(vec![("Numbers", class)]);

    assert_eq!(completed(Value::Float(1.0f32 / 3.0f32)), m.call("Numbers", "third", "()F", vec![]));
    assert_eq!(completed(Value::Int(0)), m.call("Numbers", "nanToInt", "()I", vec![]));
    assert_eq!(completed(Value::Int(i32::MIN)), m.call("Numbers", "overflow", "()I", vec![]));
    assert_eq!(completed(Value::Long(9)), m.call("Numbers", "dup2x2", "()J", vec![]));
    assert!(matches!(
        m.call("Numbers", "longDivide", "()J", vec![]),
        ExecutionOutcome::UncaughtException(_)
    ));
    assert!(m.stderr.contents().contains("java.lang.ArithmeticException: / by zero"));
}

#[test]
fn static_initializer_runs_once() {
    let mut counter = ClassBuilder::new("Counter");
    let count = index(counter.field_ref("Counter", "count", "I"));
    let out = index(counter.field_ref("java/lang/System", "out", "Ljava/io/PrintStream;"));
    let println = index(counter.method_ref("java/io/PrintStream", "println", "(Ljava/lang/String;)V"));
    let init = counter.string("init") as u8;
    let counter = counter
        .field(ACC_STATIC, "count", "I")
        .static_method(
            "<clinit>",
            "()V",
            // System.out.println("init"); count = 40;
            Code::new(
                2,
                0,
                concat(&[&[0xb2], &out, &[0x12, init, 0xb6], &println, &[0x10, 40, 0xb3], &count, &[0xb1]]),
            ),
        )
        .static_method(
            "next",
            "()I",
            // getstatic count, iconst_1, iadd, dup, putstatic count, ireturn
            Code::new(2, 0, concat(&[&[0xb2], &count, &[0x04, 0x60, 0x59, 0xb3], &count, &[0xac]])),
        )
        .build();
    let mut main = ClassBuilder::new("Main");
    let next = index(main.method_ref("Counter", "next", "()I"));
    let main = main
        .static_method(
            "twice",
            "()I",
            // invokestatic next, invokestatic next, iadd, ireturn
            Code::new(2, 0, concat(&[&[0xb8], &next, &[0xb8], &next, &[0x60, 0xac]])),
        )
        .build();
    let mut m = machine(vec![("Counter", counter), ("Main", main)]);

    assert_eq!(completed(Value::Int(83)), m.call("Main", "twice", "()I", vec![]));
    assert_eq!(completed(Value::Int(43)), m.call("Counter", "next", "()I", vec![]));
    assert_eq!("init\n", m.stdout.contents());
    let counter_id = m.vm.load_class("Counter").unwrap();
    assert_eq!(Some(Value::Int(43)), m.vm.get_static_field(counter_id, "count"));
}

#[test]
fn objects_fields_and_virtual_dispatch() {
    let mut animal = ClassBuilder::new("Animal");
    let object_init = index(animal.method_ref("java/lang/Object", "<init>", "()V"));
    let legs = index(animal.field_ref("Animal", "legs", "I"));
    let animal = animal
        .field(ACC_PUBLIC, "legs", "I")
        .method(
            ACC_PUBLIC,
            "<init>",
            "()V",
            // super(); this.legs = 4;
            Code::new(2, 1, concat(&[&[0x2a, 0xb7], &object_init, &[0x2a, 0x07, 0xb5], &legs, &[0xb1]])),
        )
        .method(ACC_PUBLIC, "sound", "()I", Code::new(1, 1, vec![0x04, 0xac]))
        .build();
    let dog = ClassBuilder::with_super("Dog", "Animal")
        .default_constructor("Animal")
        .method(ACC_PUBLIC, "sound", "()I", Code::new(1, 1, vec![0x05, 0xac]))
        .build();
    let shape = ClassBuilder::interface("Shape").abstract_method("area", "()I").build();
    let square = ClassBuilder::new("Square")
        .implements("Shape")
        .default_constructor("java/lang/Object")
        .method(ACC_PUBLIC, "area", "()I", Code::new(1, 1, vec![0x10, 9, 0xac]))
        .build();

    let mut zoo = ClassBuilder::new("Zoo");
    let dog_class = index(zoo.class("Dog"));
    let dog_init = index(zoo.method_ref("Dog", "<init>", "()V"));
    let sound = index(zoo.method_ref("Animal", "sound", "()I"));
    let legs = index(zoo.field_ref("Animal", "legs", "I"));
    let square_class = index(zoo.class("Square"));
    let square_init = index(zoo.method_ref("Square", "<init>", "()V"));
    let area = index(zoo.interface_method_ref("Shape", "area", "()I"));
    let shape_class = index(zoo.class("Shape"));
    let zoo = zoo
        .static_method(
            "dog",
            "()I",
            // Animal a = new Dog(); return a.sound() * 10 + a.legs;
            Code::new(
                3,
                1,
                concat(&[
                    &[0xbb],
                    &dog_class,
                    &[0x59, 0xb7],
                    &dog_init,
                    &[0x4b, 0x2a, 0xb6],
                    &sound,
                    &[0x10, 10, 0x68, 0x2a, 0xb4],
                    &legs,
                    &[0x60, 0xac],
                ]),
            ),
        )
        .static_method(
            "square",
            "()I",
            // ((Shape) new Square()).area()
            Code::new(
                2,
                0,
                concat(&[&[0xbb], &square_class, &[0x59, 0xb7], &square_init, &[0xb9], &area, &[1, 0, 0xac]]),
            ),
        )
        // new Shape
        .static_method("newShape", "()V", Code::new(1, 0, concat(&[&[0xbb], &shape_class, &[0x57, 0xb1]])))
        .build();
    let mut m = machine(vec![
        ("Animal", animal),
        ("Dog", dog),
        ("Shape", shape),
        ("Square", square),
        ("Zoo", zoo),
    ]);

    assert_eq!(completed(Value::Int(24)), m.call("Zoo", "dog", "()I", vec![]));
    assert_eq!(completed(Value::Int(9)), m.call("Zoo", "square", "()I", vec![]));
    assert!(matches!(
        m.call("Zoo", "newShape", "()V", vec![]),
        ExecutionOutcome::UncaughtException(_)
    ));
    assert!(m.stderr.contents().contains("java.lang.InstantiationError"));
}

#[test]
fn table_and_lookup_switches() {
    let table = concat(&[
        // iload_0, tableswitch, padding
        &[0x1a, 0xaa, 0, 0],
        &36i32.to_be_bytes(),
        &1i32.to_be_bytes(),
        &3i32.to_be_bytes(),
        &27i32.to_be_bytes(),
        &30i32.to_be_bytes(),
        &33i32.to_be_bytes(),
        // 28: bipush 10, ireturn; 31: bipush 20, ireturn; 34: bipush 30, ireturn; 37: iconst_m1, ireturn
        &[0x10, 10, 0xac, 0x10, 20, 0xac, 0x10, 30, 0xac, 0x02, 0xac],
    ]);
    let lookup = concat(&[
        // iload_0, lookupswitch, padding
        &[0x1a, 0xab, 0, 0],
        &33i32.to_be_bytes(),
        &2i32.to_be_bytes(),
        &(-5i32).to_be_bytes(),
        &27i32.to_be_bytes(),
        &100i32.to_be_bytes(),
        &30i32.to_be_bytes(),
        // 28: bipush 7, ireturn; 31: bipush 8, ireturn; 34: iconst_0, ireturn
        &[0x10, 7, 0xac, 0x10, 8, 0xac, 0x03, 0xac],
    ]);
    let class = ClassBuilder::new("Switches")
        .static_method("table", "(I)I", Code::new(1, 1, table))
        .static_method("lookup", "(I)I", Code::new(1, 1, lookup))
        .build();
    let mut m = machine(vec![("Switches", class)]);

    let mut table = |n| m.call("Switches", "table", "(I)I", vec![Value::Int(n)]);
    assert_eq!(completed(Value::Int(10)), table(1));
    assert_eq!(completed(Value::Int(20)), table(2));
    assert_eq!(completed(Value::Int(30)), table(3));
    assert_eq!(completed(Value::Int(-1)), table(0));
    assert_eq!(completed(Value::Int(-1)), table(7));

    let mut lookup = |n| m.call("Switches", "lookup", "(I)I", vec![Value::Int(n)]);
    assert_eq!(completed(Value::Int(7)), lookup(-5));
    assert_eq!(completed(Value::Int(8)), lookup(100));
    assert_eq!(completed(Value::Int(0)), lookup(3));
}

#[test]
fn deep_recursion_overflows_the_stack() {
    let mut class = ClassBuilder::new("Recurse");
    let down = index(class.method_ref("Recurse", "down", "()V"));
    let class = class
        .static_method("down", "()V", Code::new(0, 0, concat(&[&[0xb8], &down, &[0xb1]])))
        .build();
    let options = VmOptions {
        max_stack_depth: 32,
        ..VmOptions::default()
    };
    let mut m = machine_with_options(vec![("Recurse", class)], options);

    let outcome = m.call("Recurse", "down", "()V", vec![]);
    assert!(matches!(outcome, ExecutionOutcome::UncaughtException(_)));
    let stderr = m.stderr.contents();
    assert!(stderr.starts_with("Exception in thread \"main\" java.lang.StackOverflowError\n"));
    assert_eq!(33, stderr.lines().count());
}

#[test]
fn system_exit_stops_the_program() {
    let mut class = ClassBuilder::new("Quit");
    let exit = index(class.method_ref("java/lang/System", "exit", "(I)V"));
    let out = index(class.field_ref("java/lang/System", "out", "Ljava/io/PrintStream;"));
    let println = index(class.method_ref("java/io/PrintStream", "println", "(I)V"));
    let class = class
        .static_method(
            "main",
            "([Ljava/lang/String;)V",
            // System.exit(3); System.out.println(1);
            Code::new(2, 1, concat(&[&[0x06, 0xb8], &exit, &[0xb2], &out, &[0x04, 0xb6], &println, &[0xb1]])),
        )
        .build();
    let mut m = machine(vec![("Quit", class)]);

    let outcome = m.vm.run_main("Quit", &[]);
    assert_eq!(ExecutionOutcome::ExitRequested(3), outcome);
    assert_eq!(3, outcome.exit_code());
    assert_eq!("", m.stdout.contents());
}

#[test]
fn verify_errors_are_fatal() {
    let class = ClassBuilder::new("Bad")
        // fconst_1, ireturn
        .static_method("bad", "()I", Code::new(1, 0, vec![0x0c, 0xac]))
        .build();
    let mut m = machine(vec![("Bad", class)]);

    let outcome = m.call("Bad", "bad", "()I", vec![]);
    assert_eq!(
        ExecutionOutcome::Fatal(VmError::VerifyError("ireturn: expected Int, found Float".to_string())),
        outcome
    );
    assert_eq!(1, outcome.exit_code());
    assert_eq!(
        "Exception in thread \"main\" java.lang.VerifyError: ireturn: expected Int, found Float\n",
        m.stderr.contents()
    );
}

#[test]
fn main_prints_its_arguments() {
    let mut class = ClassBuilder::new("Echo");
    let out = index(class.field_ref("java/lang/System", "out", "Ljava/io/PrintStream;"));
    let print_string = index(class.method_ref("java/io/PrintStream", "println", "(Ljava/lang/String;)V"));
    let print_int = index(class.method_ref("java/io/PrintStream", "println", "(I)V"));
    let print_float = index(class.method_ref("java/io/PrintStream", "println", "(F)V"));
    let hello = class.string("hello") as u8;
    let half = class.float(2.5) as u8;
    let class = class
        .static_method(
            "main",
            "([Ljava/lang/String;)V",
            Code::new(
                3,
                1,
                concat(&[
                    // System.out.println("hello");
                    &[0xb2],
                    &out,
                    &[0x12, hello, 0xb6],
                    &print_string,
                    // System.out.println(args.length);
                    &[0xb2],
                    &out,
                    &[0x2a, 0xbe, 0xb6],
                    &print_int,
                    // System.out.println(args[1]);
                    &[0xb2],
                    &out,
                    &[0x2a, 0x04, 0x32, 0xb6],
                    &print_string,
                    // System.out.println(2.5f);
                    &[0xb2],
                    &out,
                    &[0x12, half, 0xb6],
                    &print_float,
                    &[0xb1],
                ]),
            ),
        )
        .build();
    let mut m = machine(vec![("Echo", class)]);

    let outcome = m.vm.run_main("Echo", &["a".to_string(), "b c".to_string()]);
    assert_eq!(ExecutionOutcome::Completed(None), outcome);
    assert_eq!("hello\n2\nb c\n2.5\n", m.stdout.contents());
}

#[test]
fn class_files_newer_than_the_limit_are_rejected() {
    let class = ClassBuilder::new("Modern")
        .major_version(61)
        .static_method("main", "([Ljava/lang/String;)V", Code::new(0, 1, vec![0xb1]))
        .build();
    let options = VmOptions {
        max_java_version: 11,
        ..VmOptions::default()
    };
    let mut m = machine_with_options(vec![("Modern", class.clone())], options);
    let outcome = m.vm.run_main("Modern", &[]);
    assert!(matches!(outcome, ExecutionOutcome::Fatal(VmError::ClassFormatError(_))));
    assert_eq!(1, outcome.exit_code());
    assert!(m.stderr.contents().starts_with("Error: class format error"));

    let mut m = machine(vec![("Modern", class)]);
    assert_eq!(ExecutionOutcome::Completed(None), m.vm.run_main("Modern", &[]));
}
