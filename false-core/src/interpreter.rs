//! Tree-walking stack machine.
//!
//! An [`Interpreter`] owns the console it talks to and an abort indicator.
//! Every [`Interpreter::run`] starts from an empty stack and unset
//! variables; [`Interpreter::run_with`] lets the caller supply and inspect
//! that state instead.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, trace, warn};

use crate::error::RuntimeFault;
use crate::instructions::Instruction;
use crate::language::{self, FALSE, TRUE};
use crate::operation::{BlockId, Op, Operation, Program};
use crate::value::{Stack, Value, Variables};

/// Shared stop request.
///
/// Cloning yields another handle to the same flag. Once set it stays set for
/// the lifetime of the interpreter it was taken from.
#[derive(Debug, Clone, Default)]
pub struct AbortIndicator(Arc<AtomicBool>);

impl AbortIndicator {
    pub fn new() -> Self {
        AbortIndicator::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Hooks called while a program runs. All methods default to doing nothing.
pub trait ExecutionObserver {
    fn on_start(&mut self) {}

    /// Called once per run, also when the run ends with a fault.
    fn on_end(&mut self) {}

    /// Called after each executed operation.
    fn on_step(&mut self, _operation: &Operation, _machine: &Machine) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ExecutionObserver for NoopObserver {}

/// Mutable state of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Machine {
    pub stack: Stack,
    pub variables: Variables,
}

impl Machine {
    pub fn new() -> Self {
        Machine::default()
    }
}

/// Input, output and the buffered input line read by `ß`.
struct Console<R, W> {
    input: R,
    output: W,
    /// Remaining UTF-16 code units of the last line read.
    buffer: VecDeque<u16>,
}

impl<R: BufRead, W: Write> Console<R, W> {
    fn print_line(&mut self, text: impl std::fmt::Display) -> io::Result<()> {
        writeln!(self.output, "{text}")
    }

    /// Flush pending output, then block until a full input line arrives.
    fn flush_and_read(&mut self) -> io::Result<()> {
        self.output.flush()?;
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        self.buffer = line.encode_utf16().collect();
        Ok(())
    }

    fn read_char(&mut self) -> i32 {
        self.buffer.pop_front().map_or(-1, i32::from)
    }
}

pub struct Interpreter<R, W> {
    console: Console<R, W>,
    abort: AbortIndicator,
}

impl Interpreter<io::StdinLock<'static>, io::Stdout> {
    /// Interpreter attached to the process standard streams.
    pub fn stdio() -> Self {
        Interpreter::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Interpreter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Interpreter {
            console: Console {
                input,
                output,
                buffer: VecDeque::new(),
            },
            abort: AbortIndicator::new(),
        }
    }

    /// A handle that can stop this interpreter from another thread.
    pub fn abort_handle(&self) -> AbortIndicator {
        self.abort.clone()
    }

    pub fn request_abort(&self) {
        self.abort.request();
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_set()
    }

    pub fn output(&self) -> &W {
        &self.console.output
    }

    pub fn into_output(self) -> W {
        self.console.output
    }

    /// Run `program` on a fresh machine.
    pub fn run(
        &mut self,
        program: &Program,
        observer: &mut dyn ExecutionObserver,
    ) -> Result<(), RuntimeFault> {
        let mut machine = Machine::new();
        self.run_with(program, &mut machine, observer)
    }

    /// Run `program` on caller-provided state.
    ///
    /// Returns `Ok(())` whenever an abort was requested, whatever state the
    /// program was left in.
    pub fn run_with(
        &mut self,
        program: &Program,
        machine: &mut Machine,
        observer: &mut dyn ExecutionObserver,
    ) -> Result<(), RuntimeFault> {
        debug!(operations = program.operation_count(), "run started");
        observer.on_start();
        let result = self.execute_block(program, BlockId::ROOT, machine, observer);
        let flush = self.console.output.flush();
        observer.on_end();

        if self.is_aborted() {
            if let Err(fault) = result {
                warn!(%fault, "fault ignored after abort");
            }
            debug!("run aborted");
            return Ok(());
        }
        result?;
        flush?;
        debug!(stack_depth = machine.stack.len(), "run finished");
        Ok(())
    }

    fn execute_block(
        &mut self,
        program: &Program,
        id: BlockId,
        machine: &mut Machine,
        observer: &mut dyn ExecutionObserver,
    ) -> Result<(), RuntimeFault> {
        let Some(block) = program.block(id) else {
            return Ok(());
        };
        for operation in block.operations() {
            if self.is_aborted() {
                return Ok(());
            }
            trace!(index = operation.index, op = %operation.op, "step");
            self.execute(program, operation, machine, observer)?;
            // An operation cut short by an abort is not reported.
            if self.is_aborted() {
                return Ok(());
            }
            observer.on_step(operation, machine);
        }
        Ok(())
    }

    fn execute(
        &mut self,
        program: &Program,
        operation: &Operation,
        machine: &mut Machine,
        observer: &mut dyn ExecutionObserver,
    ) -> Result<(), RuntimeFault> {
        let index = operation.index;
        match &operation.op {
            Op::Integer(value) => machine.stack.push(Value::Integer(*value)),
            Op::Character(ch) => machine.stack.push(Value::Integer(*ch as i32)),
            Op::Variable(name) => machine.stack.push(Value::Integer(*name as i32)),
            Op::Assembly(_) => {}
            Op::PrintString(text) => self.console.print_line(text)?,
            Op::Lambda(body) => machine.stack.push(Value::Function(*body)),
            Op::Instruction(instruction) => {
                self.instruction(program, *instruction, index, machine, observer)?
            }
        }
        Ok(())
    }

    fn instruction(
        &mut self,
        program: &Program,
        instruction: Instruction,
        index: u32,
        machine: &mut Machine,
        observer: &mut dyn ExecutionObserver,
    ) -> Result<(), RuntimeFault> {
        let stack = &mut machine.stack;
        match instruction {
            Instruction::Add => binary(stack, index, |a, b| Ok(a.wrapping_add(b)))?,
            Instruction::Subtract => binary(stack, index, |a, b| Ok(a.wrapping_sub(b)))?,
            Instruction::Multiply => binary(stack, index, |a, b| Ok(a.wrapping_mul(b)))?,
            Instruction::Divide => binary(stack, index, |a, b| {
                if b == 0 {
                    Err(RuntimeFault::DivisionByZero { index })
                } else {
                    Ok(a.wrapping_div(b))
                }
            })?,
            Instruction::Equal => binary(stack, index, |a, b| Ok(language::bool_value(a == b)))?,
            Instruction::Greater => binary(stack, index, |a, b| Ok(language::bool_value(a > b)))?,
            Instruction::And => binary(stack, index, |a, b| Ok(a & b))?,
            Instruction::Or => binary(stack, index, |a, b| Ok(a | b))?,
            Instruction::Negate => {
                let a = pop_integer(stack, index)?;
                stack.push(Value::Integer(a.wrapping_neg()));
            }
            Instruction::Not => {
                let a = pop_integer(stack, index)?;
                stack.push(Value::Integer(!a));
            }

            Instruction::Duplicate => {
                let top = *stack
                    .peek()
                    .ok_or(RuntimeFault::StackUnderflow { index })?;
                stack.push(top);
            }
            Instruction::Delete => {
                pop(stack, index)?;
            }
            Instruction::Swap => {
                require(stack, 2, index)?;
                let b = pop(stack, index)?;
                let a = pop(stack, index)?;
                stack.push(b);
                stack.push(a);
            }
            Instruction::Rotate => {
                require(stack, 3, index)?;
                let c = pop(stack, index)?;
                let b = pop(stack, index)?;
                let a = pop(stack, index)?;
                stack.push(b);
                stack.push(c);
                stack.push(a);
            }
            Instruction::Pick => {
                let n = pop_integer(stack, index)?;
                let depth = stack.len();
                let picked = usize::try_from(n)
                    .ok()
                    .and_then(|n| stack.pick(n))
                    .ok_or(RuntimeFault::PickOutOfRange {
                        index,
                        pick: n,
                        depth,
                    })?;
                stack.push(picked);
            }

            Instruction::Assign => {
                require(stack, 2, index)?;
                let name = pop_address(stack, index)?;
                let value = pop(stack, index)?;
                machine.variables.set(name, value);
            }
            Instruction::Read => {
                let name = pop_address(stack, index)?;
                let value = machine
                    .variables
                    .get(name)
                    .ok_or(RuntimeFault::UnsetVariable {
                        index,
                        variable: name,
                    })?;
                stack.push(value);
            }

            Instruction::Execute => {
                let body = pop_function(stack, index)?;
                self.call(program, body, index, machine, observer)?;
            }
            Instruction::If => {
                require(stack, 2, index)?;
                let condition = stack
                    .pick(1)
                    .ok_or(RuntimeFault::StackUnderflow { index })?;
                let run = to_boolean(condition, index)?;
                let body = pop_function(stack, index)?;
                pop(stack, index)?;
                if run {
                    self.call(program, body, index, machine, observer)?;
                }
            }
            Instruction::While => {
                require(stack, 2, index)?;
                let body = pop_function(stack, index)?;
                let condition = pop_function(stack, index)?;
                loop {
                    if self.is_aborted() {
                        return Ok(());
                    }
                    self.call(program, condition, index, machine, observer)?;
                    if self.is_aborted() {
                        return Ok(());
                    }
                    if !pop_boolean(&mut machine.stack, index)? {
                        break;
                    }
                    self.call(program, body, index, machine, observer)?;
                }
            }

            Instruction::PrintNumber => {
                let value = pop_integer(stack, index)?;
                self.console.print_line(value)?;
            }
            Instruction::PrintCharacter => {
                let value = pop_integer(stack, index)?;
                let ch = u16::try_from(value)
                    .ok()
                    .and_then(|unit| char::from_u32(u32::from(unit)))
                    .ok_or_else(|| RuntimeFault::TypeMismatch {
                        index,
                        expected: "Character",
                        found: value.to_string(),
                    })?;
                self.console.print_line(ch)?;
            }
            Instruction::ReadCharacter => {
                let ch = self.console.read_char();
                stack.push(Value::Integer(ch));
            }
            Instruction::Flush => self.console.flush_and_read()?,
        }
        Ok(())
    }

    /// Run a lambda body that was popped off the stack.
    fn call(
        &mut self,
        program: &Program,
        body: BlockId,
        index: u32,
        machine: &mut Machine,
        observer: &mut dyn ExecutionObserver,
    ) -> Result<(), RuntimeFault> {
        if program.block(body).is_none() {
            return Err(RuntimeFault::TypeMismatch {
                index,
                expected: "Function",
                found: format!("dangling reference to block {body}"),
            });
        }
        self.execute_block(program, body, machine, observer)
    }
}

/// Fail with an underflow unless `arity` operands are present.
fn require(stack: &Stack, arity: usize, index: u32) -> Result<(), RuntimeFault> {
    if stack.len() < arity {
        Err(RuntimeFault::StackUnderflow { index })
    } else {
        Ok(())
    }
}

fn pop(stack: &mut Stack, index: u32) -> Result<Value, RuntimeFault> {
    stack.pop().ok_or(RuntimeFault::StackUnderflow { index })
}

fn pop_integer(stack: &mut Stack, index: u32) -> Result<i32, RuntimeFault> {
    match pop(stack, index)? {
        Value::Integer(value) => Ok(value),
        other => Err(mismatch(index, "Integer", &other)),
    }
}

fn pop_function(stack: &mut Stack, index: u32) -> Result<BlockId, RuntimeFault> {
    match pop(stack, index)? {
        Value::Function(body) => Ok(body),
        other => Err(mismatch(index, "Function", &other)),
    }
}

fn pop_boolean(stack: &mut Stack, index: u32) -> Result<bool, RuntimeFault> {
    let value = pop(stack, index)?;
    to_boolean(value, index)
}

fn to_boolean(value: Value, index: u32) -> Result<bool, RuntimeFault> {
    match value {
        Value::Integer(TRUE) => Ok(true),
        Value::Integer(FALSE) => Ok(false),
        Value::Integer(other) => Err(RuntimeFault::TypeMismatch {
            index,
            expected: "Boolean",
            found: other.to_string(),
        }),
        other => Err(mismatch(index, "Boolean", &other)),
    }
}

/// Pop a variable address and resolve it to its letter.
fn pop_address(stack: &mut Stack, index: u32) -> Result<char, RuntimeFault> {
    let value = pop(stack, index)?;
    match value {
        Value::Integer(code) => u32::try_from(code)
            .ok()
            .and_then(char::from_u32)
            .filter(|ch| language::is_variable(*ch))
            .ok_or_else(|| RuntimeFault::TypeMismatch {
                index,
                expected: "Variable",
                found: code.to_string(),
            }),
        other => Err(mismatch(index, "Variable", &other)),
    }
}

/// Pop `b` then `a` and push `f(a, b)`.
fn binary(
    stack: &mut Stack,
    index: u32,
    f: impl FnOnce(i32, i32) -> Result<i32, RuntimeFault>,
) -> Result<(), RuntimeFault> {
    require(stack, 2, index)?;
    let b = pop_integer(stack, index)?;
    let a = pop_integer(stack, index)?;
    stack.push(Value::Integer(f(a, b)?));
    Ok(())
}

fn mismatch(index: u32, expected: &'static str, found: &Value) -> RuntimeFault {
    RuntimeFault::TypeMismatch {
        index,
        expected,
        found: found.type_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use std::thread;
    use std::time::Duration;

    fn run_source(source: &str, input: &str) -> (Result<(), RuntimeFault>, String, Machine) {
        let program = compile(source).expect("source should compile");
        let mut interpreter = Interpreter::new(input.as_bytes(), Vec::new());
        let mut machine = Machine::new();
        let result = interpreter.run_with(&program, &mut machine, &mut NoopObserver);
        let output = String::from_utf8(interpreter.into_output()).expect("utf-8 output");
        (result, output, machine)
    }

    fn integers(machine: &Machine) -> Vec<i32> {
        machine
            .stack
            .as_slice()
            .iter()
            .map(|v| match v {
                Value::Integer(n) => *n,
                Value::Function(_) => panic!("unexpected function on stack"),
            })
            .collect()
    }

    #[test]
    fn adds_and_prints() {
        let (result, output, machine) = run_source("1 2+.", "");
        result.expect("run");
        assert_eq!(output, "3\n");
        assert!(machine.stack.is_empty());
    }

    #[test]
    fn duplicate_keeps_the_original() {
        let (result, output, _) = run_source("1$.$.", "");
        result.expect("run");
        assert_eq!(output, "1\n1\n");
    }

    #[test]
    fn arithmetic_and_logic() {
        let (result, _, machine) = run_source("7 2- 3* 4/ 5_ 2 2= 3 2> 0~ 6 3& 6 3|", "");
        result.expect("run");
        assert_eq!(integers(&machine), vec![3, -5, -1, -1, -1, 2, 7]);
    }

    #[test]
    fn stack_shuffles() {
        let (result, _, machine) = run_source("1 2 3@ 4 5\\ 9%", "");
        result.expect("run");
        assert_eq!(integers(&machine), vec![2, 3, 1, 5, 4]);
    }

    #[test]
    fn pick_copies_from_the_top() {
        let (_, _, machine) = run_source("1 2 3 4 2ø", "");
        assert_eq!(integers(&machine), vec![1, 2, 3, 4, 2]);
        let (_, _, machine) = run_source("1 2 3 4 0O", "");
        assert_eq!(integers(&machine), vec![1, 2, 3, 4, 4]);
    }

    #[test]
    fn pick_out_of_range_faults() {
        let (result, _, _) = run_source("1 2 5ø", "");
        assert!(matches!(
            result,
            Err(RuntimeFault::PickOutOfRange { index: 4, pick: 5, depth: 2 })
        ));
        let (result, _, _) = run_source("1 1_ø", "");
        assert!(matches!(result, Err(RuntimeFault::PickOutOfRange { pick: -1, .. })));
    }

    #[test]
    fn underflow_names_the_instruction() {
        let (result, _, _) = run_source("+", "");
        assert!(matches!(result, Err(RuntimeFault::StackUnderflow { index: 1 })));
        let (result, _, _) = run_source("1+", "");
        assert!(matches!(result, Err(RuntimeFault::StackUnderflow { index: 2 })));
    }

    #[test]
    fn arity_is_checked_before_operand_types() {
        let (result, _, _) = run_source("[]+", "");
        assert!(matches!(result, Err(RuntimeFault::StackUnderflow { index: 2 })));
        let (result, _, _) = run_source("1?", "");
        assert!(matches!(result, Err(RuntimeFault::StackUnderflow { index: 2 })));
        let (result, _, _) = run_source("[]#", "");
        assert!(matches!(result, Err(RuntimeFault::StackUnderflow { index: 2 })));

        // Nothing is consumed when the operands are missing.
        let (result, _, machine) = run_source("1 2@", "");
        assert!(matches!(result, Err(RuntimeFault::StackUnderflow { index: 3 })));
        assert_eq!(integers(&machine), vec![1, 2]);
    }

    #[test]
    fn smallest_integer_is_reachable_from_source() {
        let (result, _, machine) = run_source("2147483647_1-", "");
        assert!(result.is_ok());
        assert_eq!(integers(&machine), vec![i32::MIN]);
    }

    #[test]
    fn if_checks_the_condition_before_the_body() {
        let (result, _, _) = run_source("[][]?", "");
        assert!(matches!(
            result,
            Err(RuntimeFault::TypeMismatch { index: 3, expected: "Boolean", .. })
        ));
        let (result, _, _) = run_source("0~1?", "");
        assert!(matches!(
            result,
            Err(RuntimeFault::TypeMismatch { expected: "Function", .. })
        ));
    }

    #[test]
    fn adding_functions_is_a_type_mismatch() {
        let (result, _, _) = run_source("[][]+", "");
        match result {
            Err(RuntimeFault::TypeMismatch { index, expected, found }) => {
                assert_eq!(index, 3);
                assert_eq!(expected, "Integer");
                assert_eq!(found, "Function");
            }
            other => panic!("expected type mismatch, got {other:?}"),
        }
    }

    #[test]
    fn division_by_zero_faults() {
        let (result, _, _) = run_source("1 0/", "");
        assert!(matches!(result, Err(RuntimeFault::DivisionByZero { index: 3 })));
    }

    #[test]
    fn variables_store_and_read() {
        let (result, output, machine) = run_source("5a: a;a;*. [1+]f: 41f;!.", "");
        result.expect("run");
        assert_eq!(output, "25\n42\n");
        assert_eq!(machine.variables.get('a'), Some(Value::Integer(5)));
    }

    #[test]
    fn reading_an_unset_variable_faults() {
        let (result, _, _) = run_source("q;", "");
        assert!(matches!(
            result,
            Err(RuntimeFault::UnsetVariable { index: 2, variable: 'q' })
        ));
    }

    #[test]
    fn conditionals_require_booleans() {
        let (result, output, _) = run_source("1 1=[\"yes\"]? 1 2=[\"no\"]?", "");
        result.expect("run");
        assert_eq!(output, "yes\n");

        let (result, _, _) = run_source("1[\"x\"]?", "");
        assert!(matches!(
            result,
            Err(RuntimeFault::TypeMismatch { expected: "Boolean", .. })
        ));
    }

    #[test]
    fn while_loop_counts_to_three() {
        let (result, _, machine) = run_source("0i:[3i;>][i;1+i:]#", "");
        result.expect("run");
        assert_eq!(machine.variables.get('i'), Some(Value::Integer(3)));
        assert!(machine.stack.is_empty());
    }

    #[test]
    fn prints_characters_and_strings() {
        let (result, output, _) = run_source("'A, 98, \"hello world\"", "");
        result.expect("run");
        assert_eq!(output, "A\nb\nhello world\n");

        let (result, _, _) = run_source("70000,", "");
        assert!(matches!(
            result,
            Err(RuntimeFault::TypeMismatch { expected: "Character", .. })
        ));
    }

    #[test]
    fn reads_buffered_input_lines() {
        let (result, output, _) = run_source("ß^.^.^.", "hi\r\nrest\n");
        result.expect("run");
        assert_eq!(output, "104\n105\n-1\n");

        let (_, output, _) = run_source("^.", "unread");
        assert_eq!(output, "-1\n");
    }

    #[test]
    fn inline_assembly_does_nothing() {
        let (result, _, machine) = run_source("1 99` 2", "");
        result.expect("run");
        assert_eq!(integers(&machine), vec![1, 2]);
    }

    #[test]
    fn each_run_starts_fresh() {
        let program = compile("a;").expect("compile");
        let setter = compile("1a:").expect("compile");
        let mut interpreter = Interpreter::new(io::empty(), Vec::new());
        interpreter.run(&setter, &mut NoopObserver).expect("set");
        assert!(matches!(
            interpreter.run(&program, &mut NoopObserver),
            Err(RuntimeFault::UnsetVariable { .. })
        ));
    }

    struct AbortAfter {
        handle: AbortIndicator,
        limit: usize,
        steps: usize,
        started: bool,
        ended: bool,
    }

    impl ExecutionObserver for AbortAfter {
        fn on_start(&mut self) {
            self.started = true;
        }

        fn on_end(&mut self) {
            self.ended = true;
        }

        fn on_step(&mut self, _operation: &Operation, _machine: &Machine) {
            self.steps += 1;
            if self.steps == self.limit {
                self.handle.request();
            }
        }
    }

    #[test]
    fn abort_stops_an_infinite_loop() {
        let program = compile("[0~][1%]#").expect("compile");
        let mut interpreter = Interpreter::new(io::empty(), Vec::new());
        let mut observer = AbortAfter {
            handle: interpreter.abort_handle(),
            limit: 1000,
            steps: 0,
            started: false,
            ended: false,
        };
        interpreter.run(&program, &mut observer).expect("aborted run is ok");
        assert!(observer.started && observer.ended);
        assert_eq!(observer.steps, 1000);

        // The indicator is never reset: later runs return at once.
        let mut again = AbortAfter {
            handle: interpreter.abort_handle(),
            limit: 1,
            steps: 0,
            started: false,
            ended: false,
        };
        interpreter.run(&program, &mut again).expect("run");
        assert_eq!(again.steps, 0);
        assert!(again.ended);
    }

    /// Requests an abort right after the operation with index `at`.
    struct AbortAt {
        handle: AbortIndicator,
        at: u32,
        ended: bool,
    }

    impl ExecutionObserver for AbortAt {
        fn on_end(&mut self) {
            self.ended = true;
        }

        fn on_step(&mut self, operation: &Operation, _machine: &Machine) {
            if operation.index == self.at {
                self.handle.request();
            }
        }
    }

    #[test]
    fn abort_preempts_a_fault_in_the_running_loop_body() {
        // Body `1%%` underflows on its second `%` (index 7).
        let program = compile("[0~][1%%]#").expect("compile");

        let mut plain = Interpreter::new(io::empty(), Vec::new());
        assert!(matches!(
            plain.run(&program, &mut NoopObserver),
            Err(RuntimeFault::StackUnderflow { index: 7 })
        ));

        let mut interpreter = Interpreter::new(io::empty(), Vec::new());
        let mut observer = AbortAt {
            handle: interpreter.abort_handle(),
            at: 6,
            ended: false,
        };
        assert!(interpreter.run(&program, &mut observer).is_ok());
        assert!(observer.ended);
    }

    #[test]
    fn abort_from_another_thread() {
        let program = Arc::new(compile("[0~][]#").expect("compile"));
        let mut interpreter = Interpreter::new(io::empty(), Vec::new());
        let handle = interpreter.abort_handle();

        let shared = Arc::clone(&program);
        let worker = thread::spawn(move || interpreter.run(&shared, &mut NoopObserver));

        thread::sleep(Duration::from_millis(50));
        handle.request();
        let result = worker.join().expect("worker thread");
        assert!(result.is_ok());
    }
}
