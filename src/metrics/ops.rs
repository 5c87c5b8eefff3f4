// --- Файл: src/metrics/ops.rs ---

//! Арифметика над метриками для удобного синтаксиса `a + b`.
//!
//! Каждый оператор не вычисляет ничего сразу, а создает новую
//! `MetricsLambda` с операндами в качестве аргументов (через [`combine`]).
//! Операнды не изменяются, кроме сброса при создании составной метрики.

use super::lambda::{combine, Arg};
use super::{MetricHandle, MetricValue};
use crate::error::Result;
use std::ops::{Add, Div, Mul, Neg, Sub};

type BinaryValueOp = fn(&MetricValue, &MetricValue) -> Result<MetricValue>;

fn binary<O: 'static>(name: &str, lhs: Arg<O>, rhs: Arg<O>, op: BinaryValueOp) -> MetricHandle<O> {
    combine(name, move |args| op(args.arg(0)?, args.arg(1)?), vec![lhs, rhs])
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $name:literal, $op:expr) => {
        impl<O: 'static> $trait<&MetricHandle<O>> for &MetricHandle<O> {
            type Output = MetricHandle<O>;
            fn $method(self, rhs: &MetricHandle<O>) -> MetricHandle<O> {
                binary($name, Arg::from(self), Arg::from(rhs), $op)
            }
        }

        impl<O: 'static> $trait<MetricHandle<O>> for &MetricHandle<O> {
            type Output = MetricHandle<O>;
            fn $method(self, rhs: MetricHandle<O>) -> MetricHandle<O> {
                binary($name, Arg::from(self), Arg::from(rhs), $op)
            }
        }

        impl<O: 'static> $trait<&MetricHandle<O>> for MetricHandle<O> {
            type Output = MetricHandle<O>;
            fn $method(self, rhs: &MetricHandle<O>) -> MetricHandle<O> {
                binary($name, Arg::from(self), Arg::from(rhs), $op)
            }
        }

        impl<O: 'static> $trait<MetricHandle<O>> for MetricHandle<O> {
            type Output = MetricHandle<O>;
            fn $method(self, rhs: MetricHandle<O>) -> MetricHandle<O> {
                binary($name, Arg::from(self), Arg::from(rhs), $op)
            }
        }

        impl<O: 'static> $trait<f64> for &MetricHandle<O> {
            type Output = MetricHandle<O>;
            fn $method(self, rhs: f64) -> MetricHandle<O> {
                binary($name, Arg::from(self), Arg::from(rhs), $op)
            }
        }

        impl<O: 'static> $trait<f64> for MetricHandle<O> {
            type Output = MetricHandle<O>;
            fn $method(self, rhs: f64) -> MetricHandle<O> {
                binary($name, Arg::from(self), Arg::from(rhs), $op)
            }
        }

        // Отраженная форма: константа слева.
        impl<O: 'static> $trait<&MetricHandle<O>> for f64 {
            type Output = MetricHandle<O>;
            fn $method(self, rhs: &MetricHandle<O>) -> MetricHandle<O> {
                binary($name, Arg::from(self), Arg::from(rhs), $op)
            }
        }

        impl<O: 'static> $trait<MetricHandle<O>> for f64 {
            type Output = MetricHandle<O>;
            fn $method(self, rhs: MetricHandle<O>) -> MetricHandle<O> {
                binary($name, Arg::from(self), Arg::from(rhs), $op)
            }
        }
    };
}

impl_binary_op!(Add, add, "add", MetricValue::try_add);
impl_binary_op!(Sub, sub, "sub", MetricValue::try_sub);
impl_binary_op!(Mul, mul, "mul", MetricValue::try_mul);
impl_binary_op!(Div, div, "div", MetricValue::try_div);

impl<O: 'static> Neg for &MetricHandle<O> {
    type Output = MetricHandle<O>;
    fn neg(self) -> MetricHandle<O> {
        self.map("neg", MetricValue::neg)
    }
}

impl<O: 'static> Neg for MetricHandle<O> {
    type Output = MetricHandle<O>;
    fn neg(self) -> MetricHandle<O> {
        -&self
    }
}

impl<O: 'static> MetricHandle<O> {
    /// Поэлементная функция над значением метрики.
    pub fn map<F>(&self, name: &str, f: F) -> MetricHandle<O>
    where
        F: Fn(&MetricValue) -> MetricValue + 'static,
    {
        combine(name, move |args| Ok(f(args.arg(0)?)), vec![Arg::from(self)])
    }

    /// Возведение в степень с числовым показателем.
    pub fn pow(&self, exponent: f64) -> MetricHandle<O> {
        binary("pow", Arg::from(self), Arg::from(exponent), MetricValue::try_pow)
    }

    /// Возведение в степень, где показатель - тоже метрика.
    pub fn pow_metric(&self, exponent: &MetricHandle<O>) -> MetricHandle<O> {
        binary("pow", Arg::from(self), Arg::from(exponent), MetricValue::try_pow)
    }

    /// Константа в степени метрики: `base ** self`.
    pub fn rpow(&self, base: f64) -> MetricHandle<O> {
        binary("rpow", Arg::from(base), Arg::from(self), MetricValue::try_pow)
    }

    pub fn abs(&self) -> MetricHandle<O> {
        self.map("abs", MetricValue::abs)
    }

    /// Среднее по элементам (тензор по классам -> скаляр).
    pub fn mean(&self) -> MetricHandle<O> {
        combine("mean", |args| args.arg(0)?.mean(), vec![Arg::from(self)])
    }
}
