#![forbid(unsafe_code)]

use std::collections::{BTreeSet, HashMap};

use toy_ast::builtins::{self, Accepts, ArgMode, Builtin, Returns};
use toy_ast::{BinOp, Expr, ExprKind, FunctionDef, GuardedClause, Ident};
use toy_core::{CheckedProgram, Scopes, ValueKind, is_temporary};
use toy_rt::symbols;

use crate::error::BackendError;
use crate::frame::{Frame, Slot};
use crate::target::{DEFAULT_TARGET, validate_target};

/// Routines written into every output file.
const HELPERS: &[&str] = &["print_char", "print_i", "print_str", "str_eq"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmitOptions {
    /// Label of the program entry routine.
    pub entry: String,
    pub target: String,
}

impl Default for EmitOptions {
    fn default() -> Self {
        EmitOptions {
            entry: "_start".to_string(),
            target: DEFAULT_TARGET.to_string(),
        }
    }
}

/// Lowers a checked program to NASM 32-bit assembly.
pub fn emit_program(
    checked: &CheckedProgram,
    options: &EmitOptions,
) -> Result<String, BackendError> {
    validate_target(&options.target)?;
    validate_entry(&options.entry)?;

    let mut module = Module::new(checked);
    let mut routines = String::new();
    for f in checked.program.functions() {
        routines.push_str(&module.function(f)?);
        routines.push('\n');
    }
    let entry_stmts: Vec<&Expr> = checked.program.entry_stmts().collect();
    routines.push_str(&module.entry(&options.entry, &entry_stmts)?);

    Ok(module.finish(&options.entry, &routines))
}

fn validate_entry(entry: &str) -> Result<(), BackendError> {
    let well_formed = entry
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && entry.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !well_formed {
        return Err(BackendError::new(format!(
            "entry label '{entry}' is not a valid assembly identifier"
        )));
    }
    if entry.starts_with("fn_")
        || entry.starts_with("str_")
        || HELPERS.contains(&entry)
        || symbols::is_native(entry)
    {
        return Err(BackendError::new(format!(
            "entry label '{entry}' clashes with a generated or runtime symbol"
        )));
    }
    Ok(())
}

/// Shared state across routines: the data section, the runtime symbols referenced and
/// the label counter.
struct Module<'p> {
    checked: &'p CheckedProgram,
    data: Vec<String>,
    literals: HashMap<String, String>,
    externs: BTreeSet<&'static str>,
    labels: u32,
}

impl<'p> Module<'p> {
    fn new(checked: &'p CheckedProgram) -> Self {
        Module {
            checked,
            data: Vec::new(),
            literals: HashMap::new(),
            externs: BTreeSet::new(),
            labels: 0,
        }
    }

    fn literal(&mut self, text: &str) -> String {
        if let Some(label) = self.literals.get(text) {
            return label.clone();
        }
        let label = format!("str_{}", self.data.len());
        self.data
            .push(format!("{label}: db {}", nasm_bytes(text.as_bytes())));
        self.literals.insert(text.to_string(), label.clone());
        label
    }

    fn label(&mut self) -> String {
        let n = self.labels;
        self.labels += 1;
        format!(".L{n}")
    }

    fn function(&mut self, f: &FunctionDef) -> Result<String, BackendError> {
        let mut routine = Routine::new(self);
        for (i, p) in f.params.iter().enumerate() {
            routine.env.declare(
                p.name.node.clone(),
                Local {
                    slot: Slot::Param(i as u32),
                    kind: ValueKind::from_type(p.ty.node),
                },
            );
        }

        let done = routine.module.label();
        routine.clauses(&f.clauses, &done)?;
        routine.ins("xor eax, eax");
        routine.place(&done);
        Ok(routine.finish(&mangle(&f.name.node), Exit::Return))
    }

    fn entry(&mut self, label: &str, stmts: &[&Expr]) -> Result<String, BackendError> {
        let mut routine = Routine::new(self);
        let mut status_kind = ValueKind::Undef;
        for stmt in stmts {
            routine.expr(stmt)?;
            status_kind = routine.kind(stmt)?;
        }
        if stmts.is_empty() || !status_kind.is_scalar() {
            routine.ins("xor ebx, ebx");
        } else {
            routine.ins("mov ebx, eax");
        }
        Ok(routine.finish(label, Exit::Syscall))
    }

    fn finish(self, entry: &str, routines: &str) -> String {
        let mut out = String::new();
        out.push_str("; generated by toyc\n");
        out.push_str("bits 32\n\n");

        for sym in &self.externs {
            out.push_str(&format!("extern {}\n", symbols::asm_name(sym)));
        }
        if !self.externs.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("global {entry}\n\n"));

        out.push_str("section .data\n");
        for line in &self.data {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');

        out.push_str("section .text\n\n");
        out.push_str(HELPER_ROUTINES);
        out.push('\n');
        out.push_str(routines);
        out
    }
}

#[derive(Clone, Copy, Debug)]
struct Local {
    slot: Slot,
    kind: ValueKind,
}

enum Exit {
    Return,
    /// `exit(ebx)`
    Syscall,
}

/// Code generation for one routine. Expressions leave their value in `eax`.
struct Routine<'m, 'p> {
    module: &'m mut Module<'p>,
    frame: Frame,
    env: Scopes<Local>,
    body: String,
}

/// An evaluated call argument parked in a frame slot until the call is made.
struct Staged {
    slot: Slot,
    /// Element tag pushed after the value, for element positions.
    tag: Option<i32>,
    /// Release routine to run once the call returns.
    release: Option<&'static str>,
}

impl<'m, 'p> Routine<'m, 'p> {
    fn new(module: &'m mut Module<'p>) -> Self {
        Routine {
            module,
            frame: Frame::new(),
            env: Scopes::new(),
            body: String::new(),
        }
    }

    fn ins(&mut self, text: &str) {
        self.body.push_str("    ");
        self.body.push_str(text);
        self.body.push('\n');
    }

    fn place(&mut self, label: &str) {
        self.body.push_str(label);
        self.body.push_str(":\n");
    }

    fn call(&mut self, symbol: &'static str, words: usize) {
        self.module.externs.insert(symbol);
        self.ins(&format!("call {}", symbols::asm_name(symbol)));
        self.pop_args(words);
    }

    fn call_helper(&mut self, helper: &str, words: usize) {
        self.ins(&format!("call {helper}"));
        self.pop_args(words);
    }

    fn pop_args(&mut self, words: usize) {
        if words > 0 {
            self.ins(&format!("add esp, {}", 4 * words));
        }
    }

    fn finish(self, label: &str, exit: Exit) -> String {
        let mut out = String::new();
        out.push_str(&format!("{label}:\n"));
        out.push_str("    push ebp\n");
        out.push_str("    mov ebp, esp\n");
        if self.frame.size() > 0 {
            out.push_str(&format!("    sub esp, {}\n", self.frame.size()));
        }
        out.push_str(&self.body);
        match exit {
            Exit::Return => {
                out.push_str("    mov esp, ebp\n");
                out.push_str("    pop ebp\n");
                out.push_str("    ret\n");
            }
            Exit::Syscall => {
                out.push_str("    mov eax, 1\n");
                out.push_str("    int 0x80\n");
            }
        }
        out
    }

    fn kind(&self, e: &Expr) -> Result<ValueKind, BackendError> {
        self.module
            .checked
            .annotations
            .kind_of(e.id)
            .ok_or_else(|| {
                BackendError::new(format!(
                    "no kind recorded for the expression at offset {}",
                    e.span.offset()
                ))
            })
    }

    fn lookup(&self, name: &Ident) -> Result<Local, BackendError> {
        self.env.get(&name.node).copied().ok_or_else(|| {
            BackendError::new(format!(
                "binding '{}' has no storage at offset {}",
                name.node,
                name.span.offset()
            ))
        })
    }

    /// Guard clauses in order. A matching clause jumps to `done` with its value in `eax`;
    /// falling off the end is left to the caller.
    fn clauses(&mut self, clauses: &[GuardedClause], done: &str) -> Result<(), BackendError> {
        for clause in clauses {
            let next = self.module.label();
            if !clause.is_catch_all() {
                self.expr(&clause.cond)?;
                self.ins("test eax, eax");
                self.ins(&format!("jz {next}"));
            }

            let saved = self.env.clone();
            self.expr(&clause.body)?;
            self.env = saved;

            self.ins(&format!("jmp {done}"));
            if clause.is_catch_all() {
                break;
            }
            self.place(&next);
        }
        Ok(())
    }

    fn expr(&mut self, e: &Expr) -> Result<(), BackendError> {
        match &e.kind {
            ExprKind::IntLit(n) => self.ins(&format!("mov eax, {n}")),
            ExprKind::BoolLit(b) => self.ins(&format!("mov eax, {}", u8::from(*b))),
            ExprKind::Undef => self.ins("xor eax, eax"),
            ExprKind::StringLit(text) => {
                let label = self.module.literal(text);
                self.ins(&format!("mov eax, {label}"));
            }
            ExprKind::Ident(name) => {
                let local = self.lookup(name)?;
                self.ins(&format!("mov eax, {}", local.slot));
            }
            ExprKind::Binary { left, op, right } => self.binary(left, *op, right)?,
            ExprKind::Call { callee, args } => self.call_expr(callee, args)?,
            ExprKind::Block(block) => {
                self.env.push();
                if block.stmts.is_empty() {
                    self.ins("xor eax, eax");
                }
                for stmt in &block.stmts {
                    self.expr(stmt)?;
                }
                self.env.pop();
            }
            ExprKind::Var { name, value } => {
                self.expr(value)?;
                let kind = self.kind(value)?;
                if self.module.checked.annotations.releases_previous(e.id) {
                    self.release_previous(name)?;
                }
                let slot = match self.env.get(&name.node) {
                    Some(local) => local.slot,
                    None => self.frame.binding(),
                };
                self.ins(&format!("mov {slot}, eax"));
                self.env.assign(&name.node, Local { slot, kind });
                self.ins("xor eax, eax");
            }
            ExprKind::ListRange { lo, hi } => self.list_range(lo, hi)?,
            ExprKind::ListLit(items) => self.list_literal(items)?,
            ExprKind::HeadOf(list) => self.head(list)?,
            ExprKind::TailOf(list) => self.tail(list)?,
        }
        Ok(())
    }

    /// Frees the value `name` holds before it is overwritten. The new value is in `eax`
    /// and survives.
    fn release_previous(&mut self, name: &Ident) -> Result<(), BackendError> {
        let local = self.lookup(name)?;
        let Some(routine) = release_routine(local.kind) else {
            return Ok(());
        };
        let keep = self.frame.temp();
        self.ins(&format!("mov {keep}, eax"));
        self.ins(&format!("push {}", local.slot));
        self.call(routine, 1);
        self.ins(&format!("mov eax, {keep}"));
        self.frame.release(keep);
        Ok(())
    }

    fn binary(&mut self, left: &Expr, op: BinOp, right: &Expr) -> Result<(), BackendError> {
        let (lk, rk) = (self.kind(left)?, self.kind(right)?);
        if lk.is_text() && rk.is_text() {
            return self.text_equality(left, op, right);
        }

        self.expr(left)?;
        let lhs = self.frame.temp();
        self.ins(&format!("mov {lhs}, eax"));
        self.expr(right)?;
        self.ins("mov ecx, eax");
        self.ins(&format!("mov eax, {lhs}"));
        self.frame.release(lhs);

        match op {
            BinOp::Add => self.ins("add eax, ecx"),
            BinOp::Sub => self.ins("sub eax, ecx"),
            BinOp::Mul => self.ins("imul eax, ecx"),
            BinOp::Div => {
                self.ins("cdq");
                self.ins("idiv ecx");
            }
            BinOp::And | BinOp::Or => {
                let combine = if op == BinOp::And { "and" } else { "or" };
                self.ins("test eax, eax");
                self.ins("setnz al");
                self.ins("test ecx, ecx");
                self.ins("setnz cl");
                self.ins(&format!("{combine} al, cl"));
                self.ins("movzx eax, al");
            }
            _ => {
                let set = match op {
                    BinOp::Eq => "sete",
                    BinOp::Ne => "setne",
                    BinOp::Lt => "setl",
                    BinOp::Gt => "setg",
                    BinOp::Le => "setle",
                    _ => "setge",
                };
                self.ins("cmp eax, ecx");
                self.ins(&format!("{set} al"));
                self.ins("movzx eax, al");
            }
        }
        Ok(())
    }

    /// `==`/`!=` between strings compares their bytes through `str_eq`.
    fn text_equality(&mut self, left: &Expr, op: BinOp, right: &Expr) -> Result<(), BackendError> {
        if !matches!(op, BinOp::Eq | BinOp::Ne) {
            return Err(BackendError::new(format!(
                "'{}' has no lowering for strings",
                op.symbol()
            )));
        }
        let mut staged = Vec::with_capacity(2);
        for side in [left, right] {
            self.expr(side)?;
            let kind = self.kind(side)?;
            let release = if is_temporary(side, kind) {
                release_routine(kind)
            } else {
                None
            };
            staged.push(self.stage(None, release));
        }
        self.invoke(&staged, |r, words| r.call_helper("str_eq", words))?;
        if op == BinOp::Ne {
            self.ins("xor eax, 1");
        }
        Ok(())
    }

    fn call_expr(&mut self, callee: &Ident, args: &[Expr]) -> Result<(), BackendError> {
        let checked = self.module.checked;
        if let Some(sig) = checked.annotations.function(&callee.node) {
            let mut staged = Vec::with_capacity(args.len());
            for (arg, param) in args.iter().zip(&sig.params) {
                self.expr(arg)?;
                if *param == ValueKind::String && self.kind(arg)? == ValueKind::Str {
                    self.materialize();
                }
                staged.push(self.stage(None, None));
            }
            return self.invoke(&staged, |r, words| {
                r.call_helper(&mangle(&callee.node), words);
            });
        }

        let builtin = builtins::lookup(&callee.node).ok_or_else(|| {
            BackendError::new(format!("no lowering for call to '{}'", callee.node))
        })?;
        let first = args.first();
        let first_kind = first.map(|a| self.kind(a)).transpose()?;
        match (builtin.name, first) {
            ("print", Some(arg)) => self.print(arg),
            ("println", Some(arg)) => {
                self.print(arg)?;
                self.newline();
                Ok(())
            }
            ("print_i" | "println_i", Some(arg)) => {
                self.expr(arg)?;
                self.ins("push eax");
                self.call_helper("print_i", 1);
                if builtin.name == "println_i" {
                    self.newline();
                }
                self.ins("xor eax, eax");
                Ok(())
            }
            ("exit", Some(arg)) => {
                self.expr(arg)?;
                self.ins("mov ebx, eax");
                self.ins("mov eax, 1");
                self.ins("int 0x80");
                Ok(())
            }
            ("len", _) if first_kind == Some(ValueKind::Array) => {
                self.builtin_call(builtin, "size", args)
            }
            (name, _) => {
                let symbol = native_symbol(name)?;
                self.builtin_call(builtin, symbol, args)
            }
        }
    }

    fn builtin_call(
        &mut self,
        builtin: &Builtin,
        symbol: &'static str,
        args: &[Expr],
    ) -> Result<(), BackendError> {
        let mut staged = Vec::with_capacity(args.len());
        for (arg, spec) in args.iter().zip(builtin.params) {
            self.expr(arg)?;
            let kind = self.kind(arg)?;
            let owning = spec.mode == ArgMode::Consume;
            if owning && kind == ValueKind::Str {
                self.materialize();
            }
            let tag = (spec.accepts == Accepts::Element).then(|| kind.element_tag());
            let release = if spec.mode == ArgMode::Read && is_temporary(arg, kind) {
                release_routine(kind)
            } else {
                None
            };
            staged.push(self.stage(tag, release));
        }
        self.invoke(&staged, |r, words| r.call(symbol, words))?;
        if builtin.returns == Returns::Undef {
            self.ins("xor eax, eax");
        }
        Ok(())
    }

    /// Replaces the string literal address in `eax` with a fresh heap copy.
    fn materialize(&mut self) {
        self.ins("push eax");
        self.call("String", 1);
    }

    fn stage(&mut self, tag: Option<i32>, release: Option<&'static str>) -> Staged {
        let slot = self.frame.temp();
        self.ins(&format!("mov {slot}, eax"));
        Staged { slot, tag, release }
    }

    /// Pushes staged arguments right to left, calls, then releases read temporaries.
    fn invoke(
        &mut self,
        staged: &[Staged],
        call: impl FnOnce(&mut Self, usize),
    ) -> Result<(), BackendError> {
        let mut words = 0;
        for arg in staged.iter().rev() {
            if let Some(tag) = arg.tag {
                self.ins(&format!("push dword {tag}"));
                words += 1;
            }
            self.ins(&format!("push {}", arg.slot));
            words += 1;
        }
        call(self, words);

        if staged.iter().any(|a| a.release.is_some()) {
            let result = self.frame.temp();
            self.ins(&format!("mov {result}, eax"));
            for arg in staged {
                if let Some(routine) = arg.release {
                    self.ins(&format!("push {}", arg.slot));
                    self.call(routine, 1);
                }
            }
            self.ins(&format!("mov eax, {result}"));
            self.frame.release(result);
        }
        for arg in staged {
            self.frame.release(arg.slot);
        }
        Ok(())
    }

    fn print(&mut self, arg: &Expr) -> Result<(), BackendError> {
        let kind = self.kind(arg)?;
        self.expr(arg)?;
        let routine: Option<(&str, bool)> = match kind {
            ValueKind::Int | ValueKind::Bool => Some(("print_i", true)),
            ValueKind::Str | ValueKind::String => Some(("print_str", true)),
            ValueKind::Array => Some(("print_array", false)),
            ValueKind::Undef => None,
        };
        if let Some((routine, helper)) = routine {
            let staged = self.stage(None, None);
            let release = if is_temporary(arg, kind) {
                release_routine(kind)
            } else {
                None
            };
            let staged = Staged { release, ..staged };
            self.invoke(&[staged], |r, words| {
                if helper {
                    r.call_helper(routine, words);
                } else {
                    r.call("print_array", words);
                }
            })?;
        }
        self.ins("xor eax, eax");
        Ok(())
    }

    /// Writes `\n`; `eax` is clobbered.
    fn newline(&mut self) {
        self.ins("push dword 10");
        self.call_helper("print_char", 1);
        self.ins("xor eax, eax");
    }

    fn list_range(&mut self, lo: &Expr, hi: &Expr) -> Result<(), BackendError> {
        self.expr(lo)?;
        let next = self.frame.temp();
        self.ins(&format!("mov {next}, eax"));
        self.expr(hi)?;
        let last = self.frame.temp();
        self.ins(&format!("mov {last}, eax"));

        let sized = self.module.label();
        self.ins(&format!("sub eax, {next}"));
        self.ins("inc eax");
        self.ins(&format!("mov ecx, {last}"));
        self.ins(&format!("cmp ecx, {next}"));
        self.ins(&format!("jge {sized}"));
        self.ins("xor eax, eax");
        self.place(&sized);
        self.ins("push eax");
        self.call("Array_new", 1);
        let array = self.frame.temp();
        self.ins(&format!("mov {array}, eax"));

        let head = self.module.label();
        let done = self.module.label();
        self.place(&head);
        self.ins(&format!("mov eax, {next}"));
        self.ins(&format!("cmp eax, {last}"));
        self.ins(&format!("jg {done}"));
        self.ins(&format!("push dword {}", ValueKind::Int.element_tag()));
        self.ins("push eax");
        self.ins(&format!("push {array}"));
        self.call("push", 3);
        self.ins(&format!("inc {next}"));
        self.ins(&format!("jmp {head}"));
        self.place(&done);
        self.ins(&format!("mov eax, {array}"));

        for slot in [next, last, array] {
            self.frame.release(slot);
        }
        Ok(())
    }

    fn list_literal(&mut self, items: &[Expr]) -> Result<(), BackendError> {
        self.ins(&format!("push dword {}", items.len()));
        self.call("Array_new", 1);
        let array = self.frame.temp();
        self.ins(&format!("mov {array}, eax"));

        for item in items {
            self.expr(item)?;
            let kind = self.kind(item)?;
            if kind == ValueKind::Str {
                self.materialize();
            }
            self.ins(&format!("push dword {}", kind.element_tag()));
            self.ins("push eax");
            self.ins(&format!("push {array}"));
            self.call("push", 3);
        }
        self.ins(&format!("mov eax, {array}"));
        self.frame.release(array);
        Ok(())
    }

    /// `head(l)`: `get(l, 0)`, or Undef when `l` is empty.
    fn head(&mut self, list: &Expr) -> Result<(), BackendError> {
        self.expr(list)?;
        let l = self.frame.temp();
        self.ins(&format!("mov {l}, eax"));
        self.ins("push eax");
        self.call("size", 1);

        let empty = self.module.label();
        self.ins("test eax, eax");
        self.ins(&format!("jz {empty}"));
        self.ins("push dword 0");
        self.ins(&format!("push {l}"));
        self.call("get", 2);
        self.place(&empty);

        self.release_list_temporary(list, l)
    }

    /// `tail(l)`: the runtime's deep copy of everything after the first element.
    fn tail(&mut self, list: &Expr) -> Result<(), BackendError> {
        self.expr(list)?;
        let l = self.frame.temp();
        self.ins(&format!("mov {l}, eax"));
        self.ins("push eax");
        self.call("Tail", 1);

        self.release_list_temporary(list, l)
    }

    fn release_list_temporary(&mut self, list: &Expr, l: Slot) -> Result<(), BackendError> {
        if is_temporary(list, self.kind(list)?) {
            let result = self.frame.temp();
            self.ins(&format!("mov {result}, eax"));
            self.ins(&format!("push {l}"));
            self.call("free_array", 1);
            self.ins(&format!("mov eax, {result}"));
            self.frame.release(result);
        }
        self.frame.release(l);
        Ok(())
    }
}

fn mangle(name: &str) -> String {
    format!("fn_{name}")
}

fn release_routine(kind: ValueKind) -> Option<&'static str> {
    match kind {
        ValueKind::String => Some("free_str"),
        ValueKind::Array => Some("free_array"),
        _ => None,
    }
}

fn native_symbol(name: &str) -> Result<&'static str, BackendError> {
    symbols::ALL
        .iter()
        .copied()
        .find(|s| *s == name)
        .ok_or_else(|| BackendError::new(format!("'{name}' has no runtime entry point")))
}

/// Renders bytes as a NUL-terminated NASM `db` operand list, quoting printable runs.
pub(crate) fn nasm_bytes(bytes: &[u8]) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut run = String::new();
    for &b in bytes {
        if (b' '..=b'~').contains(&b) && b != b'"' {
            run.push(b as char);
        } else {
            if !run.is_empty() {
                parts.push(format!("\"{run}\""));
                run.clear();
            }
            parts.push(b.to_string());
        }
    }
    if !run.is_empty() {
        parts.push(format!("\"{run}\""));
    }
    parts.push("0".to_string());
    parts.join(", ")
}

const HELPER_ROUTINES: &str = "\
print_char:
    push ebp
    mov ebp, esp
    push ebx
    mov eax, 4
    mov ebx, 1
    lea ecx, [ebp+8]
    mov edx, 1
    int 0x80
    pop ebx
    pop ebp
    ret

print_i:
    push ebp
    mov ebp, esp
    push esi
    mov eax, [ebp+8]
    test eax, eax
    jns .magnitude
    push eax
    push dword '-'
    call print_char
    add esp, 4
    pop eax
    neg eax
.magnitude:
    mov ecx, 10
    mov esi, 10
.extract:
    xor edx, edx
    div ecx
    push edx
    dec esi
    jnz .extract
    mov esi, 10
.strip:
    cmp esi, 1
    je .emit
    cmp dword [esp], 0
    jne .emit
    add esp, 4
    dec esi
    jmp .strip
.emit:
    pop eax
    add eax, '0'
    push eax
    call print_char
    add esp, 4
    dec esi
    jnz .emit
    pop esi
    pop ebp
    ret

print_str:
    push ebp
    mov ebp, esp
    push esi
    mov esi, [ebp+8]
.next:
    movzx eax, byte [esi]
    test eax, eax
    jz .done
    push eax
    call print_char
    add esp, 4
    inc esi
    jmp .next
.done:
    pop esi
    pop ebp
    ret

str_eq:
    push ebp
    mov ebp, esp
    push esi
    push edi
    mov esi, [ebp+8]
    mov edi, [ebp+12]
.compare:
    movzx eax, byte [esi]
    movzx ecx, byte [edi]
    cmp eax, ecx
    jne .differ
    test eax, eax
    jz .same
    inc esi
    inc edi
    jmp .compare
.same:
    mov eax, 1
    jmp .done
.differ:
    xor eax, eax
.done:
    pop edi
    pop esi
    pop ebp
    ret
";
