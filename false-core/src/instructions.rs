//! Single-character primitives of the FALSE language.
//!
//! The table below is the one place that ties a source symbol to an
//! instruction and to its bytecode opcode. The validator, parser, codec,
//! disassembler and the language reference all look things up here instead
//! of hard-coding operator characters.

use std::fmt::Write as _;

/// Instruction kind of a payload-free primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    // Variable access
    Assign,
    Read,
    Execute,

    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Negate,

    // Comparison and logic
    Equal,
    Greater,
    And,
    Or,
    Not,

    // Stack manipulation
    Duplicate,
    Delete,
    Swap,
    Rotate,
    Pick,

    // Control flow
    If,
    While,

    // I/O
    PrintNumber,
    PrintCharacter,
    ReadCharacter,
    Flush,
}

/// Section of the language reference an instruction is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    VariableAccess,
    Arithmetic,
    Logic,
    Stack,
    Control,
    InputOutput,
}

impl Category {
    fn title(self) -> &'static str {
        match self {
            Category::VariableAccess => "Variable access",
            Category::Arithmetic => "Arithmetic operators",
            Category::Logic => "Logic relations operators",
            Category::Stack => "In-built functions operators",
            Category::Control => "Control structures",
            Category::InputOutput => "I/O",
        }
    }
}

/// Metadata about a single primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionDescriptor {
    pub instruction: Instruction,

    /// Canonical source symbol, also used by the disassembler.
    pub symbol: char,

    /// ASCII spelling accepted for symbols that are awkward to type.
    pub alternate: Option<char>,

    /// Bytecode opcode.
    pub opcode: u8,

    pub category: Category,

    /// One-line description for the language reference.
    pub summary: &'static str,
}

/// Every primitive known to the toolchain, in reference order.
pub const INSTRUCTIONS: &[InstructionDescriptor] = &[
    ASSIGN,
    READ,
    EXECUTE,
    ADD,
    SUBTRACT,
    MULTIPLY,
    DIVIDE,
    NEGATE,
    EQUAL,
    GREATER,
    AND,
    OR,
    NOT,
    DUPLICATE,
    DELETE,
    SWAP,
    ROTATE,
    PICK,
    IF,
    WHILE,
    PRINT_NUMBER,
    PRINT_CHARACTER,
    FLUSH,
    READ_CHARACTER,
];

const ASSIGN: InstructionDescriptor = InstructionDescriptor {
    instruction: Instruction::Assign,
    symbol: ':',
    alternate: None,
    opcode: 14,
    category: Category::VariableAccess,
    summary: "assign value to variable",
};

const READ: InstructionDescriptor = InstructionDescriptor {
    instruction: Instruction::Read,
    symbol: ';',
    alternate: None,
    opcode: 15,
    category: Category::VariableAccess,
    summary: "read variable",
};

const EXECUTE: InstructionDescriptor = InstructionDescriptor {
    instruction: Instruction::Execute,
    symbol: '!',
    alternate: None,
    opcode: 16,
    category: Category::VariableAccess,
    summary: "execute the lambda at the top of the stack",
};

const ADD: InstructionDescriptor = InstructionDescriptor {
    instruction: Instruction::Add,
    symbol: '+',
    alternate: None,
    opcode: 17,
    category: Category::Arithmetic,
    summary: "addition",
};

const SUBTRACT: InstructionDescriptor = InstructionDescriptor {
    instruction: Instruction::Subtract,
    symbol: '-',
    alternate: None,
    opcode: 18,
    category: Category::Arithmetic,
    summary: "subtraction",
};

const MULTIPLY: InstructionDescriptor = InstructionDescriptor {
    instruction: Instruction::Multiply,
    symbol: '*',
    alternate: None,
    opcode: 19,
    category: Category::Arithmetic,
    summary: "multiplication",
};

const DIVIDE: InstructionDescriptor = InstructionDescriptor {
    instruction: Instruction::Divide,
    symbol: '/',
    alternate: None,
    opcode: 20,
    category: Category::Arithmetic,
    summary: "division",
};

const NEGATE: InstructionDescriptor = InstructionDescriptor {
    instruction: Instruction::Negate,
    symbol: '_',
    alternate: None,
    opcode: 21,
    category: Category::Arithmetic,
    summary: "unary minus",
};

const EQUAL: InstructionDescriptor = InstructionDescriptor {
    instruction: Instruction::Equal,
    symbol: '=',
    alternate: None,
    opcode: 23,
    category: Category::Logic,
    summary: "equals",
};

const GREATER: InstructionDescriptor = InstructionDescriptor {
    instruction: Instruction::Greater,
    symbol: '>',
    alternate: None,
    opcode: 24,
    category: Category::Logic,
    summary: "greater than",
};

const AND: InstructionDescriptor = InstructionDescriptor {
    instruction: Instruction::And,
    symbol: '&',
    alternate: None,
    opcode: 25,
    category: Category::Logic,
    summary: "logical and",
};

const OR: InstructionDescriptor = InstructionDescriptor {
    instruction: Instruction::Or,
    symbol: '|',
    alternate: None,
    opcode: 26,
    category: Category::Logic,
    summary: "logical or",
};

const NOT: InstructionDescriptor = InstructionDescriptor {
    instruction: Instruction::Not,
    symbol: '~',
    alternate: None,
    opcode: 27,
    category: Category::Logic,
    summary: "logical not",
};

const DUPLICATE: InstructionDescriptor = InstructionDescriptor {
    instruction: Instruction::Duplicate,
    symbol: '$',
    alternate: None,
    opcode: 29,
    category: Category::Stack,
    summary: "duplicate the topmost item",
};

const DELETE: InstructionDescriptor = InstructionDescriptor {
    instruction: Instruction::Delete,
    symbol: '%',
    alternate: None,
    opcode: 30,
    category: Category::Stack,
    summary: "delete the topmost item",
};

const SWAP: InstructionDescriptor = InstructionDescriptor {
    instruction: Instruction::Swap,
    symbol: '\\',
    alternate: None,
    opcode: 31,
    category: Category::Stack,
    summary: "swap the two topmost items",
};

const ROTATE: InstructionDescriptor = InstructionDescriptor {
    instruction: Instruction::Rotate,
    symbol: '@',
    alternate: None,
    opcode: 32,
    category: Category::Stack,
    summary: "rotate the three topmost items",
};

const PICK: InstructionDescriptor = InstructionDescriptor {
    instruction: Instruction::Pick,
    symbol: '\u{00F8}',
    alternate: Some('O'),
    opcode: 33,
    category: Category::Stack,
    summary: "copy the nth item to the top",
};

const IF: InstructionDescriptor = InstructionDescriptor {
    instruction: Instruction::If,
    symbol: '?',
    alternate: None,
    opcode: 35,
    category: Category::Control,
    summary: "run the lambda if the condition is true",
};

const WHILE: InstructionDescriptor = InstructionDescriptor {
    instruction: Instruction::While,
    symbol: '#',
    alternate: None,
    opcode: 37,
    category: Category::Control,
    summary: "run the body while the condition lambda yields true",
};

const PRINT_NUMBER: InstructionDescriptor = InstructionDescriptor {
    instruction: Instruction::PrintNumber,
    symbol: '.',
    alternate: None,
    opcode: 38,
    category: Category::InputOutput,
    summary: "print the topmost item as number",
};

const PRINT_CHARACTER: InstructionDescriptor = InstructionDescriptor {
    instruction: Instruction::PrintCharacter,
    symbol: ',',
    alternate: None,
    opcode: 39,
    category: Category::InputOutput,
    summary: "print the topmost item as character",
};

const FLUSH: InstructionDescriptor = InstructionDescriptor {
    instruction: Instruction::Flush,
    symbol: '\u{00DF}',
    alternate: Some('S'),
    opcode: 40,
    category: Category::InputOutput,
    summary: "flush output and read a line of input",
};

const READ_CHARACTER: InstructionDescriptor = InstructionDescriptor {
    instruction: Instruction::ReadCharacter,
    symbol: '^',
    alternate: None,
    opcode: 41,
    category: Category::InputOutput,
    summary: "read a character from the input buffer (-1 if empty)",
};

/// Look up the primitive spelled by `symbol` (canonical or alternate).
pub fn find_by_symbol(symbol: char) -> Option<&'static InstructionDescriptor> {
    INSTRUCTIONS
        .iter()
        .find(|d| d.symbol == symbol || d.alternate == Some(symbol))
}

/// Look up the primitive encoded by `opcode`.
pub fn find_by_opcode(opcode: u8) -> Option<&'static InstructionDescriptor> {
    INSTRUCTIONS.iter().find(|d| d.opcode == opcode)
}

impl Instruction {
    pub fn from_symbol(symbol: char) -> Option<Instruction> {
        find_by_symbol(symbol).map(|d| d.instruction)
    }

    pub fn from_opcode(opcode: u8) -> Option<Instruction> {
        find_by_opcode(opcode).map(|d| d.instruction)
    }

    pub fn descriptor(self) -> &'static InstructionDescriptor {
        match self {
            Instruction::Assign => &ASSIGN,
            Instruction::Read => &READ,
            Instruction::Execute => &EXECUTE,
            Instruction::Add => &ADD,
            Instruction::Subtract => &SUBTRACT,
            Instruction::Multiply => &MULTIPLY,
            Instruction::Divide => &DIVIDE,
            Instruction::Negate => &NEGATE,
            Instruction::Equal => &EQUAL,
            Instruction::Greater => &GREATER,
            Instruction::And => &AND,
            Instruction::Or => &OR,
            Instruction::Not => &NOT,
            Instruction::Duplicate => &DUPLICATE,
            Instruction::Delete => &DELETE,
            Instruction::Swap => &SWAP,
            Instruction::Rotate => &ROTATE,
            Instruction::Pick => &PICK,
            Instruction::If => &IF,
            Instruction::While => &WHILE,
            Instruction::PrintNumber => &PRINT_NUMBER,
            Instruction::PrintCharacter => &PRINT_CHARACTER,
            Instruction::Flush => &FLUSH,
            Instruction::ReadCharacter => &READ_CHARACTER,
        }
    }

    pub fn symbol(self) -> char {
        self.descriptor().symbol
    }

    pub fn opcode(self) -> u8 {
        self.descriptor().opcode
    }
}

/// Render the language overview printed by `false-cli reference`.
pub fn reference() -> String {
    let mut out = String::new();
    out.push_str("FALSE language overview\n\n");
    out.push_str("-- Truth values --\n");
    let _ = writeln!(out, "{:<6}boolean value of true", crate::language::TRUE);
    let _ = writeln!(out, "{:<6}boolean value of false", crate::language::FALSE);
    out.push_str("\n-- Miscellaneous --\n");
    out.push_str("{ }   comment\n");
    out.push_str("[ ]   lambda / function\n");
    out.push_str("a-z   variable address\n");
    out.push_str("'     character literal\n");
    out.push_str("`     inline assembly (ignored)\n");
    out.push_str("\"\"    print string\n");

    let categories = [
        Category::VariableAccess,
        Category::Arithmetic,
        Category::Logic,
        Category::Stack,
        Category::Control,
        Category::InputOutput,
    ];
    for category in categories {
        let _ = write!(out, "\n-- {} --\n", category.title());
        for d in INSTRUCTIONS.iter().filter(|d| d.category == category) {
            let _ = writeln!(out, "{:<6}{}", d.symbol, d.summary);
            if let Some(alt) = d.alternate {
                let _ = writeln!(out, "{:<6}alternative spelling of {}", alt, d.symbol);
            }
        }
    }
    out
}
