use chumsky::prelude::*;

use crate::error::ParserError;

pub(crate) type Extra<'a> = extra::Err<ParserError<'a>>;

pub(crate) type BoxedParser<'a, I, T> = Boxed<'a, 'a, I, T, Extra<'a>>;
