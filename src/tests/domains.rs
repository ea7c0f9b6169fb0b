use super::{eval, eval_error, eval_number};
use crate::runtime::value::Value;
use pretty_assertions::assert_eq;

#[test]
fn declaration_yields_and_binds_the_domain() {
    let value = eval("dominio calculadora { variable pi = 3; }");
    assert_eq!(value.to_string(), "dominio calculadora");
    assert!(matches!(
        eval("dominio calculadora { variable pi = 3; } calculadora"),
        Value::Domain(domain) if domain.members.len() == 1
    ));
}

#[test]
fn members_are_callable() {
    let source = "dominio calculadora { variable suma = procedimiento(a,b){ regresa a+b; } } calculadora.suma(1,3);";
    assert_eq!(eval_number(source), 4.0);
}

#[test]
fn members_see_each_other() {
    let source = "
dominio geometria {
  variable doble = procedimiento(x) { regresa x * 2; };
  variable perimetro = procedimiento(lado) { regresa doble(lado) * 2; };
}
geometria.perimetro(3);";
    assert_eq!(eval_number(source), 12.0);
}

#[test]
fn missing_member_is_an_error() {
    assert_eq!(
        eval_error("dominio calculadora { variable suma = 1; }\ncalculadora.resta;"),
        "el dominio 'calculadora' no tiene el miembro 'resta' en la linea 2 columna 12"
    );
}

#[test]
fn member_access_on_other_values_fails() {
    assert_eq!(
        eval_error("variable x = 1; x.valor;"),
        "no se puede acceder al miembro 'valor' en un objeto de tipo NUMBER en la linea 1 columna 18"
    );
}

#[test]
fn builtin_domains_resolve_like_user_domains() {
    assert_eq!(eval_number("mates.minimo(4, 2, 8)"), 2.0);
    assert_eq!(eval_number("arreglos.ultimo([1, 2, 3])"), 3.0);
    assert!(matches!(
        eval("diccionarios.tiene_clave({\"a\": 1}, \"a\")"),
        Value::Boolean(true)
    ));
}
