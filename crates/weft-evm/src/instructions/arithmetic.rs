//! Arithmetic, comparison and bitwise instructions

use weft_primitives::U256;

use crate::error::EvmResult;
use crate::evm::Evm;
use crate::interpreter::{Control, Scope};
use crate::word;

macro_rules! unary_op {
    ($name:ident, $f:expr) => {
        pub(crate) fn $name(_evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
            let a = scope.stack.pop()?;
            scope.stack.push($f(a))?;
            Ok(Control::Continue)
        }
    };
}

macro_rules! binary_op {
    ($name:ident, $f:expr) => {
        pub(crate) fn $name(_evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
            let a = scope.stack.pop()?;
            let b = scope.stack.pop()?;
            scope.stack.push($f(a, b))?;
            Ok(Control::Continue)
        }
    };
}

macro_rules! ternary_op {
    ($name:ident, $f:expr) => {
        pub(crate) fn $name(_evm: &mut Evm<'_>, scope: &mut Scope<'_>) -> EvmResult<Control> {
            let a = scope.stack.pop()?;
            let b = scope.stack.pop()?;
            let c = scope.stack.pop()?;
            scope.stack.push($f(a, b, c))?;
            Ok(Control::Continue)
        }
    };
}

binary_op!(op_add, word::add);
binary_op!(op_mul, word::mul);
binary_op!(op_sub, word::sub);
binary_op!(op_div, word::div);
binary_op!(op_sdiv, word::sdiv);
binary_op!(op_mod, word::rem);
binary_op!(op_smod, word::smod);
ternary_op!(op_addmod, word::addmod);
ternary_op!(op_mulmod, word::mulmod);
binary_op!(op_exp, word::exp);
binary_op!(op_signextend, word::signextend);

binary_op!(op_lt, |a: U256, b: U256| word::from_bool(a < b));
binary_op!(op_gt, |a: U256, b: U256| word::from_bool(a > b));
binary_op!(op_slt, |a, b| word::from_bool(word::slt(a, b)));
binary_op!(op_sgt, |a, b| word::from_bool(word::sgt(a, b)));
binary_op!(op_eq, |a: U256, b: U256| word::from_bool(a == b));
unary_op!(op_iszero, |a: U256| word::from_bool(a.is_zero()));

binary_op!(op_and, |a: U256, b: U256| a & b);
binary_op!(op_or, |a: U256, b: U256| a | b);
binary_op!(op_xor, |a: U256, b: U256| a ^ b);
unary_op!(op_not, |a: U256| !a);
binary_op!(op_byte, word::byte);
binary_op!(op_shl, word::shl);
binary_op!(op_shr, word::shr);
binary_op!(op_sar, word::sar);
